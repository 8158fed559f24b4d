//! Daily reminder time-of-day.
//!
//! # Invariants
//! - `hour` is in `0..=23` and `minute` in `0..=59`; the only constructors
//!   are [`ReminderTime::new`] and [`ReminderTime::parse`], both checked.
//! - Canonical text form is zero-padded `HH:MM`, the persisted format.

use chrono::{NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static HH_MM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9])$").expect("reminder time pattern is valid")
});

/// Rejected reminder time input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidReminderTime {
    pub input: String,
}

impl Display for InvalidReminderTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid reminder time `{}`; expected HH:MM between 00:00 and 23:59",
            self.input
        )
    }
}

impl Error for InvalidReminderTime {}

/// Hour and minute of the daily trigger, process-local, no seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReminderTime {
    hour: u8,
    minute: u8,
}

impl ReminderTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, InvalidReminderTime> {
        if hour > 23 || minute > 59 {
            return Err(InvalidReminderTime {
                input: format!("{hour}:{minute}"),
            });
        }
        Ok(Self { hour, minute })
    }

    /// Parses strict `HH:MM` text, surrounding whitespace ignored.
    pub fn parse(value: &str) -> Result<Self, InvalidReminderTime> {
        let trimmed = value.trim();
        let invalid = || InvalidReminderTime {
            input: trimmed.to_string(),
        };
        let captures = HH_MM.captures(trimmed).ok_or_else(invalid)?;
        let hour = captures[1].parse::<u8>().map_err(|_| invalid())?;
        let minute = captures[2].parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }

    /// Truncates `instant` to its minute of the day.
    pub fn of_instant(instant: NaiveDateTime) -> Self {
        // chrono guarantees hour < 24 and minute < 60
        Self {
            hour: instant.hour() as u8,
            minute: instant.minute() as u8,
        }
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    /// Returns whether `instant`, truncated to the minute, is this time.
    ///
    /// Exact match only; `09:00` does not match `09:01:00`.
    pub fn matches(self, instant: NaiveDateTime) -> bool {
        Self::of_instant(instant) == self
    }
}

impl Display for ReminderTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ReminderTime {
    type Err = InvalidReminderTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ReminderTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReminderTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
