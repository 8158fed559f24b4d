//! Store contract consumed by the reminder engine.
//!
//! # Responsibility
//! - Narrow the task and check-in repositories to the two reads a tick needs.
//! - Own a dedicated SQLite connection for the scheduler thread.

use crate::db::open_db;
use crate::model::check_in::CheckIn;
use crate::model::day_window::DayWindow;
use crate::model::task::{Task, TaskId};
use crate::repo::check_in_repo::{CheckInRepository, SqliteCheckInRepository};
use crate::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use crate::repo::RepoResult;
use rusqlite::Connection;
use std::path::Path;

/// Reads the reminder engine performs against persistent state.
pub trait ReminderStore {
    fn list_active_tasks(&self) -> RepoResult<Vec<Task>>;
    /// Inclusive-start, exclusive-end existence query.
    fn find_check_in(&self, task_id: TaskId, window: &DayWindow) -> RepoResult<Option<CheckIn>>;
}

/// [`ReminderStore`] over an owned SQLite connection.
///
/// The connection is `Send`, so the store can move onto the scheduler thread
/// while request handlers keep their own connections to the same file.
pub struct SqliteReminderStore {
    conn: Connection,
}

impl SqliteReminderStore {
    /// Opens and migrates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Uses an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ReminderStore for SqliteReminderStore {
    fn list_active_tasks(&self) -> RepoResult<Vec<Task>> {
        SqliteTaskRepository::try_new(&self.conn)?.list_active_tasks()
    }

    fn find_check_in(&self, task_id: TaskId, window: &DayWindow) -> RepoResult<Option<CheckIn>> {
        SqliteCheckInRepository::try_new(&self.conn)?.find_check_in(task_id, window)
    }
}
