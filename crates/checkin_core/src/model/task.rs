//! Monitored daily task.
//!
//! # Responsibility
//! - Define the task record read by the reminder engine and written by the
//!   request layer.
//! - Validate user-supplied fields before persistence.
//!
//! # Invariants
//! - `id` is assigned once at creation and never reused.
//! - `title` and `email` are non-blank after trimming.
//! - `reminder_time` is always a valid `00:00`-`23:59` value by construction.

use crate::model::reminder_time::ReminderTime;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable task identifier.
pub type TaskId = Uuid;

const TITLE_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 500;
const EMAIL_MAX_CHARS: usize = 120;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

/// Validation failures for task fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    TitleTooLong { max_chars: usize },
    DescriptionTooLong { max_chars: usize },
    EmptyEmail,
    InvalidEmail(String),
    EmailTooLong { max_chars: usize },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be blank"),
            Self::TitleTooLong { max_chars } => {
                write!(f, "task title exceeds {max_chars} characters")
            }
            Self::DescriptionTooLong { max_chars } => {
                write!(f, "task description exceeds {max_chars} characters")
            }
            Self::EmptyEmail => write!(f, "task email must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::EmailTooLong { max_chars } => {
                write!(f, "task email exceeds {max_chars} characters")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// A recurring daily obligation with a reminder destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub reminder_time: ReminderTime,
    /// Reminder destination.
    pub email: String,
    /// Inactive tasks are never due.
    pub is_active: bool,
    /// Process-local creation time.
    pub created_at: NaiveDateTime,
}

impl Task {
    /// Creates an active task with a fresh id.
    pub fn new(
        title: impl Into<String>,
        reminder_time: ReminderTime,
        email: impl Into<String>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            reminder_time,
            email: email.into(),
            is_active: true,
            created_at,
        }
    }

    /// Checks field-level invariants.
    ///
    /// Called by repository write paths and by the read path, so rows written
    /// around the repository are still rejected.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(TaskValidationError::TitleTooLong {
                max_chars: TITLE_MAX_CHARS,
            });
        }
        if let Some(description) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX_CHARS {
                return Err(TaskValidationError::DescriptionTooLong {
                    max_chars: DESCRIPTION_MAX_CHARS,
                });
            }
        }

        let email = self.email.trim();
        if email.is_empty() {
            return Err(TaskValidationError::EmptyEmail);
        }
        if email.chars().count() > EMAIL_MAX_CHARS {
            return Err(TaskValidationError::EmailTooLong {
                max_chars: EMAIL_MAX_CHARS,
            });
        }
        if !EMAIL_RE.is_match(email) {
            return Err(TaskValidationError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }
}
