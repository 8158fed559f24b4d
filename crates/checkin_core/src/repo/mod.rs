//! Repository contracts and SQLite implementations for tasks and check-ins.
//!
//! # Responsibility
//! - Keep SQL and row mapping inside the persistence boundary.
//! - Report semantic failures (`NotFound`, `CheckInConflict`) separately from
//!   transport errors.
//!
//! # Invariants
//! - Write paths validate records before touching SQL.
//! - Timestamps are stored as fixed-width local text, so SQL text comparison
//!   matches chronological order.

use crate::db::DbError;
use crate::model::reminder_time::InvalidReminderTime;
use crate::model::task::{TaskId, TaskValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod check_in_repo;
pub mod task_repo;

const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TIMESTAMP_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DAY_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task and check-in persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    TaskNotFound(TaskId),
    /// A check-in already exists for `task_id` on `day`.
    CheckInConflict {
        task_id: TaskId,
        day: NaiveDate,
    },
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::CheckInConflict { task_id, day } => {
                write!(f, "task {task_id} is already checked in for {day}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; run migrations first")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<InvalidReminderTime> for RepoError {
    fn from(value: InvalidReminderTime) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub(crate) fn timestamp_to_db(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_WRITE_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(value: &str, column: &str) -> RepoResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_READ_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!("invalid timestamp `{value}` in {column}"))
    })
}

pub(crate) fn day_to_db(value: NaiveDate) -> String {
    value.format(DAY_FORMAT).to_string()
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_timestamp, timestamp_to_db};
    use chrono::NaiveDate;

    #[test]
    fn timestamps_are_fixed_width_and_sort_as_text() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 4).unwrap();
        let early = day.and_hms_opt(9, 5, 0).unwrap();
        let late = day.and_hms_micro_opt(9, 5, 0, 1).unwrap();

        let early_text = timestamp_to_db(early);
        let late_text = timestamp_to_db(late);
        assert_eq!(early_text, "2026-07-04 09:05:00.000000");
        assert_eq!(early_text.len(), late_text.len());
        assert!(early_text < late_text);

        assert_eq!(parse_timestamp(&late_text, "t").unwrap(), late);
    }

    #[test]
    fn parse_timestamp_reports_column_on_garbage() {
        let err = parse_timestamp("yesterday", "check_ins.check_in_time").unwrap_err();
        assert!(err.to_string().contains("check_ins.check_in_time"));
    }
}
