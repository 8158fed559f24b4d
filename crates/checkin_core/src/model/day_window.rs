//! Half-open local day window `[midnight, next midnight)`.
//!
//! # Invariants
//! - `start` is always a local midnight and `end` is exactly one day later.
//! - Membership is inclusive of `start` and exclusive of `end`.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DayWindow {
    /// Window for the calendar day `date`.
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN);
        // Only NaiveDate::MAX has no successor; clamp instead of panicking.
        let end = date
            .checked_add_days(Days::new(1))
            .map_or(NaiveDateTime::MAX, |next| next.and_time(NaiveTime::MIN));
        Self { start, end }
    }

    /// Window of the day `instant` falls on.
    pub fn containing(instant: NaiveDateTime) -> Self {
        Self::for_date(instant.date())
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::DayWindow;
    use chrono::NaiveDate;

    #[test]
    fn containing_spans_local_midnight_to_midnight() {
        let noon = NaiveDate::from_ymd_opt(2026, 2, 28)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let window = DayWindow::containing(noon);
        assert_eq!(window.start().to_string(), "2026-02-28 00:00:00");
        assert_eq!(window.end().to_string(), "2026-03-01 00:00:00");
    }

    #[test]
    fn contains_is_half_open() {
        let day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let window = DayWindow::for_date(day);
        assert!(window.contains(day.and_hms_opt(0, 0, 0).unwrap()));
        assert!(window.contains(day.and_hms_opt(23, 59, 59).unwrap()));
        assert!(!window.contains(window.end()));
        assert!(!window.contains(window.start() - chrono::Duration::nanoseconds(1)));
    }
}
