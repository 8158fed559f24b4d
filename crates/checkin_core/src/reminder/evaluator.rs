//! Due-task evaluation and same-day satisfaction check.
//!
//! # Invariants
//! - A task is due only when it is active and its reminder time equals `now`
//!   truncated to the minute. There is no look-back window, so a minute the
//!   scheduler misses is missed for the whole day.
//! - Satisfaction is a pure read over `[midnight, next midnight)`.

use crate::model::day_window::DayWindow;
use crate::model::task::{Task, TaskId};
use crate::reminder::store::ReminderStore;
use crate::repo::RepoResult;
use chrono::NaiveDateTime;

/// Returns whether `now` is the trigger minute of `task` for today.
pub fn is_due(task: &Task, now: NaiveDateTime) -> bool {
    task.is_active && task.reminder_time.matches(now)
}

/// Returns whether `task_id` already has a check-in on the day of `now`.
pub fn is_satisfied<S>(store: &S, task_id: TaskId, now: NaiveDateTime) -> RepoResult<bool>
where
    S: ReminderStore + ?Sized,
{
    let window = DayWindow::containing(now);
    Ok(store.find_check_in(task_id, &window)?.is_some())
}
