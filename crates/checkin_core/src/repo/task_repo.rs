//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over the `tasks` table.
//! - Provide the active-task scan the reminder scheduler runs every tick.
//!
//! # Invariants
//! - Writes call `Task::validate()` first.
//! - `get_task`/`list_tasks` reject invalid persisted rows.
//! - `list_active_tasks` skips rows whose reminder time does not parse, so one
//!   malformed schedule never blocks reminders for other tasks.
//! - `delete_task` removes the task's check-ins before the task, atomically.

use crate::model::reminder_time::ReminderTime;
use crate::model::task::{Task, TaskId};
use crate::repo::{
    bool_to_int, ensure_tables, parse_timestamp, timestamp_to_db, RepoError, RepoResult,
};
use log::warn;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    reminder_time,
    email,
    is_active,
    created_at
FROM tasks";

/// Repository interface for task CRUD.
pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// All tasks, newest first.
    fn list_tasks(&self) -> RepoResult<Vec<Task>>;
    /// Active tasks with a valid reminder time, in reminder-time order.
    fn list_active_tasks(&self) -> RepoResult<Vec<Task>>;
    /// Deletes the task and all of its check-ins.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Wraps a migrated connection; fails when the schema is missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["tasks", "check_ins"])?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (
                id,
                title,
                description,
                reminder_time,
                email,
                is_active,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                task.id.to_string(),
                task.title.trim(),
                task.description.as_deref(),
                task.reminder_time.to_string(),
                task.email.trim(),
                bool_to_int(task.is_active),
                timestamp_to_db(task.created_at),
            ],
        )?;

        Ok(task.id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                description = ?2,
                reminder_time = ?3,
                email = ?4,
                is_active = ?5
             WHERE id = ?6;",
            params![
                task.title.trim(),
                task.description.as_deref(),
                task.reminder_time.to_string(),
                task.email.trim(),
                bool_to_int(task.is_active),
                task.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::TaskNotFound(task.id));
        }
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_task_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} ORDER BY created_at DESC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn list_active_tasks(&self) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL} WHERE is_active = 1 ORDER BY reminder_time ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            match parse_task_row(row) {
                Ok(task) => tasks.push(task),
                Err(RepoError::InvalidData(message)) => {
                    let id: String = row.get("id")?;
                    warn!(
                        "event=task_skip module=repo status=invalid task_id={} reason={}",
                        id, message
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(tasks)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let id_text = id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM check_ins WHERE task_id = ?1;", [&id_text])?;
        let changed = tx.execute("DELETE FROM tasks WHERE id = ?1;", [&id_text])?;
        if changed == 0 {
            // dropping `tx` rolls back
            return Err(RepoError::TaskNotFound(id));
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in tasks.id")))?;

    let reminder_text: String = row.get("reminder_time")?;
    let reminder_time = ReminderTime::parse(&reminder_text)?;

    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_active value `{other}` in tasks.is_active"
            )));
        }
    };

    let created_text: String = row.get("created_at")?;
    let task = Task {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        reminder_time,
        email: row.get("email")?,
        is_active,
        created_at: parse_timestamp(&created_text, "tasks.created_at")?,
    };
    task.validate()
        .map_err(|err| RepoError::InvalidData(format!("task {id_text}: {err}")))?;
    Ok(task)
}
