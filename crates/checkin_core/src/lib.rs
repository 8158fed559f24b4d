//! Core of the daily check-in reminder service.
//!
//! Tasks carry a daily reminder time; a background scheduler emails a
//! reminder at that minute unless the task was already checked in today.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::check_in::{CheckIn, CheckInId};
pub use model::day_window::DayWindow;
pub use model::reminder_time::{InvalidReminderTime, ReminderTime};
pub use model::task::{Task, TaskId, TaskValidationError};
pub use reminder::clock::{Clock, SystemClock};
pub use reminder::evaluator::{is_due, is_satisfied};
pub use reminder::notifier::{
    EmailNotifier, MailTransport, Notifier, NotifyError, OutgoingEmail, ReminderTemplate,
    TransportError,
};
pub use reminder::outbox::OutboxTransport;
pub use reminder::scheduler::{ReminderEngine, ReminderScheduler, SchedulerError, TickReport};
pub use reminder::store::{ReminderStore, SqliteReminderStore};
pub use repo::check_in_repo::{CheckInRepository, SqliteCheckInRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use service::check_in_service::CheckInService;
pub use service::task_service::{NewTask, TaskPatch, TaskService, TaskServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
