//! Check-in repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Append check-ins, enforcing one check-in per task per local day.
//! - Answer the day-window existence query used by the reminder engine.
//!
//! # Invariants
//! - Window queries are `start <= check_in_time < end`.
//! - `insert_check_in` runs existence, window check and insert inside one
//!   `BEGIN IMMEDIATE` transaction; the `(task_id, check_in_day)` unique
//!   index rejects anything that slips past it.
//! - Check-ins are never updated.

use crate::model::check_in::CheckIn;
use crate::model::day_window::DayWindow;
use crate::model::task::TaskId;
use crate::repo::{
    day_to_db, ensure_tables, parse_timestamp, timestamp_to_db, RepoError, RepoResult,
};
use chrono::NaiveDateTime;
use log::info;
use rusqlite::{ffi, params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const CHECK_IN_SELECT_SQL: &str = "SELECT id, task_id, check_in_time FROM check_ins";

/// Repository interface for check-in persistence.
pub trait CheckInRepository {
    /// Records a check-in at `at`, rejecting a second one in the same day.
    ///
    /// # Errors
    /// - [`RepoError::TaskNotFound`] when the task does not exist.
    /// - [`RepoError::CheckInConflict`] when the day already has a check-in.
    fn insert_check_in(&self, task_id: TaskId, at: NaiveDateTime) -> RepoResult<CheckIn>;
    /// Earliest check-in for `task_id` inside `window`, if any.
    fn find_check_in(&self, task_id: TaskId, window: &DayWindow) -> RepoResult<Option<CheckIn>>;
    /// All check-ins of a task, most recent first.
    fn list_check_ins_for_task(&self, task_id: TaskId) -> RepoResult<Vec<CheckIn>>;
    /// Check-ins of every task inside `window`, oldest first.
    fn list_check_ins_in_window(&self, window: &DayWindow) -> RepoResult<Vec<CheckIn>>;
}

/// SQLite-backed check-in repository.
pub struct SqliteCheckInRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCheckInRepository<'conn> {
    /// Wraps a migrated connection; fails when the schema is missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["tasks", "check_ins"])?;
        Ok(Self { conn })
    }
}

impl CheckInRepository for SqliteCheckInRepository<'_> {
    fn insert_check_in(&self, task_id: TaskId, at: NaiveDateTime) -> RepoResult<CheckIn> {
        let window = DayWindow::containing(at);
        let conflict = || RepoError::CheckInConflict {
            task_id,
            day: window.date(),
        };

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !task_exists_in_tx(&tx, task_id)? {
            return Err(RepoError::TaskNotFound(task_id));
        }
        if find_in_window(&tx, task_id, &window)?.is_some() {
            return Err(conflict());
        }

        let check_in = CheckIn::new(task_id, at);
        let inserted = tx.execute(
            "INSERT INTO check_ins (id, task_id, check_in_time, check_in_day)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                check_in.id.to_string(),
                task_id.to_string(),
                timestamp_to_db(at),
                day_to_db(window.date()),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Err(conflict()),
            Err(err) => return Err(err.into()),
        }
        tx.commit()?;

        info!(
            "event=check_in_insert module=repo status=ok task_id={} day={}",
            task_id,
            window.date()
        );
        Ok(check_in)
    }

    fn find_check_in(&self, task_id: TaskId, window: &DayWindow) -> RepoResult<Option<CheckIn>> {
        find_in_window(self.conn, task_id, window)
    }

    fn list_check_ins_for_task(&self, task_id: TaskId) -> RepoResult<Vec<CheckIn>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHECK_IN_SELECT_SQL}
             WHERE task_id = ?1
             ORDER BY check_in_time DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([task_id.to_string()])?;
        collect_check_ins(&mut rows)
    }

    fn list_check_ins_in_window(&self, window: &DayWindow) -> RepoResult<Vec<CheckIn>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHECK_IN_SELECT_SQL}
             WHERE check_in_time >= ?1
               AND check_in_time < ?2
             ORDER BY check_in_time ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![
            timestamp_to_db(window.start()),
            timestamp_to_db(window.end()),
        ])?;
        collect_check_ins(&mut rows)
    }
}

fn find_in_window(
    conn: &Connection,
    task_id: TaskId,
    window: &DayWindow,
) -> RepoResult<Option<CheckIn>> {
    let mut stmt = conn.prepare(&format!(
        "{CHECK_IN_SELECT_SQL}
         WHERE task_id = ?1
           AND check_in_time >= ?2
           AND check_in_time < ?3
         ORDER BY check_in_time ASC
         LIMIT 1;"
    ))?;
    let mut rows = stmt.query(params![
        task_id.to_string(),
        timestamp_to_db(window.start()),
        timestamp_to_db(window.end()),
    ])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_check_in_row(row)?)),
        None => Ok(None),
    }
}

fn task_exists_in_tx(tx: &Transaction<'_>, task_id: TaskId) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1);",
        [task_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn collect_check_ins(rows: &mut rusqlite::Rows<'_>) -> RepoResult<Vec<CheckIn>> {
    let mut check_ins = Vec::new();
    while let Some(row) = rows.next()? {
        check_ins.push(parse_check_in_row(row)?);
    }
    Ok(check_ins)
}

fn parse_check_in_row(row: &Row<'_>) -> RepoResult<CheckIn> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "check_ins.id")?;
    let task_text: String = row.get("task_id")?;
    let task_id = parse_uuid(&task_text, "check_ins.task_id")?;
    let time_text: String = row.get("check_in_time")?;

    Ok(CheckIn {
        id,
        task_id,
        checked_in_at: parse_timestamp(&time_text, "check_ins.check_in_time")?,
    })
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
