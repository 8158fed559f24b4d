//! Task management use-cases for the request layer.
//!
//! # Responsibility
//! - Turn raw request input into validated `Task` records.
//! - Apply partial updates, including deactivation.
//!
//! # Invariants
//! - Title, reminder time and email are required on create.
//! - Updated tasks are re-validated before they reach the repository.
//! - Blank descriptions are stored as `None`.

use crate::model::reminder_time::{InvalidReminderTime, ReminderTime};
use crate::model::task::{Task, TaskId, TaskValidationError};
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoError;
use chrono::NaiveDateTime;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Create request for a new task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// `HH:MM` text as entered by the user.
    pub reminder_time: String,
    pub email: String,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub reminder_time: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.reminder_time.is_none()
            && self.email.is_none()
            && self.is_active.is_none()
    }
}

/// Errors from task service operations.
#[derive(Debug)]
pub enum TaskServiceError {
    /// A required create field is blank.
    MissingField(&'static str),
    InvalidReminderTime(InvalidReminderTime),
    Validation(TaskValidationError),
    NotFound(TaskId),
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::InvalidReminderTime(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidReminderTime(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::TaskNotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<InvalidReminderTime> for TaskServiceError {
    fn from(value: InvalidReminderTime) -> Self {
        Self::InvalidReminderTime(value)
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Task use-case facade over a [`TaskRepository`].
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an active task stamped with `now`.
    pub fn create_task(&self, request: NewTask, now: NaiveDateTime) -> TaskServiceResult<Task> {
        let title = required(request.title, "title")?;
        let reminder_text = required(request.reminder_time, "reminder_time")?;
        let email = required(request.email, "email")?;
        let reminder_time = ReminderTime::parse(&reminder_text)?;

        let mut task = Task::new(title, reminder_time, email, now);
        task.description = normalize_description(request.description);
        task.validate()?;
        self.repo.create_task(&task)?;

        info!(
            "event=task_create module=service status=ok task_id={} reminder_time={}",
            task.id, task.reminder_time
        );
        Ok(task)
    }

    /// Applies `patch` to the stored task and returns the updated record.
    pub fn update_task(&self, id: TaskId, patch: TaskPatch) -> TaskServiceResult<Task> {
        let mut task = self
            .repo
            .get_task(id)?
            .ok_or(TaskServiceError::NotFound(id))?;

        if let Some(title) = patch.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            task.description = normalize_description(description);
        }
        if let Some(reminder_text) = patch.reminder_time {
            task.reminder_time = ReminderTime::parse(&reminder_text)?;
        }
        if let Some(email) = patch.email {
            task.email = email.trim().to_string();
        }
        if let Some(is_active) = patch.is_active {
            task.is_active = is_active;
        }

        task.validate()?;
        self.repo.update_task(&task)?;

        info!(
            "event=task_update module=service status=ok task_id={} is_active={}",
            task.id, task.is_active
        );
        Ok(task)
    }

    pub fn get_task(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.repo
            .get_task(id)?
            .ok_or(TaskServiceError::NotFound(id))
    }

    pub fn list_tasks(&self) -> TaskServiceResult<Vec<Task>> {
        Ok(self.repo.list_tasks()?)
    }

    /// Deletes a task together with its check-in history.
    pub fn delete_task(&self, id: TaskId) -> TaskServiceResult<()> {
        self.repo.delete_task(id)?;
        info!("event=task_delete module=service status=ok task_id={id}");
        Ok(())
    }
}

fn required(value: String, field: &'static str) -> TaskServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TaskServiceError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
