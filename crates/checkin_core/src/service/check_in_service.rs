//! Check-in submission and history use-cases.
//!
//! # Responsibility
//! - Accept at most one check-in per task per local day.
//! - Expose per-task and per-day check-in history.
//!
//! # Invariants
//! - A second submission in the same day window returns
//!   `RepoError::CheckInConflict` and writes nothing.

use crate::model::check_in::CheckIn;
use crate::model::day_window::DayWindow;
use crate::model::task::TaskId;
use crate::repo::check_in_repo::CheckInRepository;
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDateTime;
use log::{info, warn};

/// Check-in use-case facade over a [`CheckInRepository`].
pub struct CheckInService<R: CheckInRepository> {
    repo: R,
}

impl<R: CheckInRepository> CheckInService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Records that `task_id` was done at `now`.
    pub fn check_in(&self, task_id: TaskId, now: NaiveDateTime) -> RepoResult<CheckIn> {
        match self.repo.insert_check_in(task_id, now) {
            Ok(check_in) => Ok(check_in),
            Err(err @ RepoError::CheckInConflict { .. }) => {
                warn!(
                    "event=check_in module=service status=conflict task_id={} day={}",
                    task_id,
                    now.date()
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Whether `task_id` already has a check-in on the day of `now`.
    pub fn is_checked_in_today(&self, task_id: TaskId, now: NaiveDateTime) -> RepoResult<bool> {
        let window = DayWindow::containing(now);
        Ok(self.repo.find_check_in(task_id, &window)?.is_some())
    }

    /// History of one task, most recent first.
    pub fn list_check_ins(&self, task_id: TaskId) -> RepoResult<Vec<CheckIn>> {
        self.repo.list_check_ins_for_task(task_id)
    }

    /// Every check-in recorded on the day of `now`.
    pub fn list_today(&self, now: NaiveDateTime) -> RepoResult<Vec<CheckIn>> {
        let window = DayWindow::containing(now);
        let check_ins = self.repo.list_check_ins_in_window(&window)?;
        info!(
            "event=check_in_list module=service status=ok day={} count={}",
            window.date(),
            check_ins.len()
        );
        Ok(check_ins)
    }
}
