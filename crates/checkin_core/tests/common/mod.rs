#![allow(dead_code)]

use checkin_core::{Clock, Notifier, NotifyError, Task, TaskId, TransportError};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, minute, second).unwrap()
}

/// Notifier that records deliveries and fails or panics for selected tasks.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<TaskId>>>,
    attempted: Arc<Mutex<Vec<TaskId>>>,
    failing: Arc<Mutex<HashSet<TaskId>>>,
    panicking: Arc<Mutex<HashSet<TaskId>>>,
}

impl RecordingNotifier {
    pub fn fail_for(&self, task_id: TaskId) {
        self.failing.lock().unwrap().insert(task_id);
    }

    pub fn panic_for(&self, task_id: TaskId) {
        self.panicking.lock().unwrap().insert(task_id);
    }

    /// Every task an attempt was made for, delivered or not.
    pub fn attempted(&self) -> Vec<TaskId> {
        self.attempted.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<TaskId> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn attempt_notify(&self, task: &Task) -> Result<(), NotifyError> {
        self.attempted.lock().unwrap().push(task.id);
        let panics = self.panicking.lock().unwrap().contains(&task.id);
        if panics {
            panic!("notifier crashed for task {}", task.id);
        }
        if self.failing.lock().unwrap().contains(&task.id) {
            return Err(NotifyError::Transport(TransportError::new(
                "connection refused",
            )));
        }
        self.sent.lock().unwrap().push(task.id);
        Ok(())
    }
}

/// Clock that replays scripted instants, then repeats the last one.
pub struct ScriptedClock {
    instants: Mutex<VecDeque<NaiveDateTime>>,
    last: Mutex<NaiveDateTime>,
}

impl ScriptedClock {
    pub fn new(instants: impl IntoIterator<Item = NaiveDateTime>) -> Self {
        let instants: VecDeque<_> = instants.into_iter().collect();
        let last = *instants.back().expect("script needs at least one instant");
        Self {
            instants: Mutex::new(instants),
            last: Mutex::new(last),
        }
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> NaiveDateTime {
        let next = self.instants.lock().unwrap().pop_front();
        match next {
            Some(instant) => {
                *self.last.lock().unwrap() = instant;
                instant
            }
            None => *self.last.lock().unwrap(),
        }
    }
}
