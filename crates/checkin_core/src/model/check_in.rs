//! Check-in record: proof that a task's daily obligation was met.

use crate::model::task::TaskId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CheckInId = Uuid;

/// Append-only check-in event. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: CheckInId,
    pub task_id: TaskId,
    /// Process-local time of the check-in.
    pub checked_in_at: NaiveDateTime,
}

impl CheckIn {
    pub fn new(task_id: TaskId, checked_in_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            checked_in_at,
        }
    }
}
