//! Per-minute reminder scheduler.
//!
//! # Responsibility
//! - `ReminderEngine` runs one tick: scan active tasks, keep the due ones,
//!   drop the satisfied ones, notify the rest.
//! - `ReminderScheduler` drives ticks at second 0 of every minute on a
//!   dedicated thread, with explicit `start()`/`stop()`.
//!
//! # Invariants
//! - A tick writes nothing itself; dedupe within a day relies only on the
//!   check-in window query.
//! - Per-task failures, panics in the store or notifier included, are logged
//!   and counted; only a failure to list active tasks aborts a tick, and the
//!   loop survives it.
//! - Each minute is evaluated at most once per loop, even when the wall clock
//!   lags the wait timer.
//! - After `stop()` no new tick starts. An in-flight tick finishes the task it
//!   is dispatching and skips the rest. Timed-out sends still running in the
//!   notifier are not joined; `stop()` logs how many remain.

use crate::model::task::Task;
use crate::reminder::clock::Clock;
use crate::reminder::evaluator::{is_due, is_satisfied};
use crate::reminder::notifier::Notifier;
use crate::reminder::store::ReminderStore;
use crate::repo::RepoResult;
use chrono::{Duration as ChronoDuration, NaiveDateTime, Timelike};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Outcome counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Active tasks returned by the store.
    pub scanned: usize,
    /// Tasks whose reminder minute matched.
    pub due: usize,
    /// Due tasks already checked in today.
    pub satisfied: usize,
    /// Due tasks whose notification was delivered.
    pub notified: usize,
    /// Due tasks whose satisfaction read or dispatch failed or panicked.
    pub failed: usize,
    /// Tasks left unevaluated because a stop was requested mid-tick.
    pub skipped: usize,
}

/// Tick logic with injected store and notifier.
pub struct ReminderEngine<S, N> {
    store: S,
    notifier: N,
}

impl<S: ReminderStore, N: Notifier> ReminderEngine<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Due and unsatisfied tasks at `now`, without notifying.
    ///
    /// Tasks whose satisfaction read fails are left out.
    pub fn pending_reminders(&self, now: NaiveDateTime) -> RepoResult<Vec<Task>> {
        let tasks = self.store.list_active_tasks()?;
        Ok(tasks
            .into_iter()
            .filter(|task| is_due(task, now))
            .filter(|task| matches!(is_satisfied(&self.store, task.id, now), Ok(false)))
            .collect())
    }

    /// Runs one reminder pass at `now`.
    ///
    /// # Errors
    /// Only when the active task list cannot be read.
    pub fn run_tick(&self, now: NaiveDateTime) -> RepoResult<TickReport> {
        self.run_tick_until(now, &|| false)
    }

    fn run_tick_until(
        &self,
        now: NaiveDateTime,
        stop_requested: &dyn Fn() -> bool,
    ) -> RepoResult<TickReport> {
        let tasks = self.store.list_active_tasks()?;
        let mut report = TickReport {
            scanned: tasks.len(),
            ..TickReport::default()
        };

        for (index, task) in tasks.iter().enumerate() {
            if stop_requested() {
                report.skipped = tasks.len() - index;
                warn!(
                    "event=reminder_tick module=reminder status=interrupted skipped={}",
                    report.skipped
                );
                break;
            }
            if !is_due(task, now) {
                continue;
            }
            report.due += 1;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.remind(task, now)));
            match outcome {
                Ok(Outcome::Satisfied) => report.satisfied += 1,
                Ok(Outcome::Notified) => report.notified += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Err(_) => {
                    report.failed += 1;
                    error!(
                        "event=reminder_send module=reminder status=panic task_id={}",
                        task.id
                    );
                }
            }
        }

        Ok(report)
    }

    fn remind(&self, task: &Task, now: NaiveDateTime) -> Outcome {
        match is_satisfied(&self.store, task.id, now) {
            Ok(true) => {
                debug!(
                    "event=reminder_skip module=reminder status=satisfied task_id={}",
                    task.id
                );
                Outcome::Satisfied
            }
            Ok(false) => match self.notifier.attempt_notify(task) {
                Ok(()) => {
                    info!(
                        "event=reminder_send module=reminder status=ok task_id={} reminder_time={}",
                        task.id, task.reminder_time
                    );
                    Outcome::Notified
                }
                Err(err) => {
                    warn!(
                        "event=reminder_send module=reminder status=error task_id={} error={}",
                        task.id, err
                    );
                    Outcome::Failed
                }
            },
            Err(err) => {
                warn!(
                    "event=reminder_check module=reminder status=error task_id={} error={}",
                    task.id, err
                );
                Outcome::Failed
            }
        }
    }
}

enum Outcome {
    Satisfied,
    Notified,
    Failed,
}

/// Lifecycle errors of [`ReminderScheduler`].
#[derive(Debug)]
pub enum SchedulerError {
    AlreadyRunning,
    NotRunning,
    Spawn(std::io::Error),
    /// The loop thread panicked while stopping.
    LoopPanicked,
    /// A previous panic or spawn failure dropped the engine.
    EngineLost,
}

impl Display for SchedulerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "reminder scheduler is already running"),
            Self::NotRunning => write!(f, "reminder scheduler is not running"),
            Self::Spawn(err) => write!(f, "failed to spawn scheduler thread: {err}"),
            Self::LoopPanicked => write!(f, "reminder scheduler thread panicked"),
            Self::EngineLost => write!(f, "reminder engine was lost by an earlier failure"),
        }
    }
}

impl Error for SchedulerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

struct RunningLoop<S, N> {
    stop: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    handle: JoinHandle<ReminderEngine<S, N>>,
}

impl<S, N> RunningLoop<S, N> {
    fn shutdown(self) -> Result<ReminderEngine<S, N>, SchedulerError> {
        self.stop.store(true, Ordering::Release);
        let _ = self.wake_tx.try_send(());
        self.handle.join().map_err(|_| SchedulerError::LoopPanicked)
    }
}

/// Background service that ticks a [`ReminderEngine`] once per minute.
///
/// Several schedulers can run side by side; nothing is process-global.
pub struct ReminderScheduler<S, N, C> {
    engine: Option<ReminderEngine<S, N>>,
    clock: Arc<C>,
    running: Option<RunningLoop<S, N>>,
}

impl<S, N, C> ReminderScheduler<S, N, C>
where
    S: ReminderStore + Send + 'static,
    N: Notifier + Send + 'static,
    C: Clock + 'static,
{
    pub fn new(engine: ReminderEngine<S, N>, clock: C) -> Self {
        Self {
            engine: Some(engine),
            clock: Arc::new(clock),
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The engine, while the loop is stopped.
    pub fn engine(&self) -> Option<&ReminderEngine<S, N>> {
        self.engine.as_ref()
    }

    /// Spawns the loop thread; the first tick fires at the next minute.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.running.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let engine = self.engine.take().ok_or(SchedulerError::EngineLost)?;

        let stop = Arc::new(AtomicBool::new(false));
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);
        let clock = Arc::clone(&self.clock);
        let loop_stop = Arc::clone(&stop);

        // On spawn failure the engine is dropped along with the closure.
        let spawned = thread::Builder::new()
            .name("reminder-scheduler".to_string())
            .spawn(move || run_loop(engine, clock.as_ref(), &loop_stop, &wake_rx));

        match spawned {
            Ok(handle) => {
                self.running = Some(RunningLoop {
                    stop,
                    wake_tx,
                    handle,
                });
                info!("event=scheduler_start module=reminder status=ok");
                Ok(())
            }
            Err(err) => {
                error!("event=scheduler_start module=reminder status=error error={err}");
                Err(SchedulerError::Spawn(err))
            }
        }
    }

    /// Signals the loop, waits for the in-flight tick, and keeps the engine
    /// so the scheduler can be started again.
    pub fn stop(&mut self) -> Result<(), SchedulerError> {
        let running = self.running.take().ok_or(SchedulerError::NotRunning)?;
        let engine = match running.shutdown() {
            Ok(engine) => engine,
            Err(err) => {
                error!("event=scheduler_stop module=reminder status=error error={err}");
                return Err(err);
            }
        };
        let detached = engine.notifier().outstanding_sends();
        if detached > 0 {
            warn!("event=scheduler_stop module=reminder status=detached_sends count={detached}");
        }
        self.engine = Some(engine);
        info!("event=scheduler_stop module=reminder status=ok");
        Ok(())
    }
}

impl<S, N, C> Drop for ReminderScheduler<S, N, C> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown();
        }
    }
}

fn run_loop<S, N, C>(
    engine: ReminderEngine<S, N>,
    clock: &C,
    stop: &AtomicBool,
    wake_rx: &Receiver<()>,
) -> ReminderEngine<S, N>
where
    S: ReminderStore,
    N: Notifier,
    C: Clock + ?Sized,
{
    info!("event=scheduler_loop module=reminder status=start");
    let mut last_minute: Option<NaiveDateTime> = None;
    loop {
        let now = clock.now();
        let boundary = next_minute_boundary(last_minute.map_or(now, |minute| now.max(minute)));
        let wait = (boundary - now).to_std().unwrap_or(Duration::ZERO);

        match wake_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        if stop.load(Ordering::Acquire) {
            break;
        }

        // Never evaluate a minute early if the timer fired ahead of the clock.
        let tick_at = clock.now().max(boundary);
        last_minute = Some(truncate_to_minute(tick_at));
        let stop_requested = || stop.load(Ordering::Acquire);
        let ticked = panic::catch_unwind(AssertUnwindSafe(|| {
            engine.run_tick_until(tick_at, &stop_requested)
        }));
        match ticked {
            Ok(Ok(report)) if report.due == 0 && report.skipped == 0 => {
                debug!(
                    "event=reminder_tick module=reminder status=idle at={} scanned={}",
                    tick_at, report.scanned
                );
            }
            Ok(Ok(report)) => info!(
                "event=reminder_tick module=reminder status=ok at={} scanned={} due={} satisfied={} notified={} failed={} skipped={}",
                tick_at,
                report.scanned,
                report.due,
                report.satisfied,
                report.notified,
                report.failed,
                report.skipped
            ),
            Ok(Err(err)) => error!(
                "event=reminder_tick module=reminder status=error at={} error={}",
                tick_at, err
            ),
            Err(_) => error!(
                "event=reminder_tick module=reminder status=panic at={}",
                tick_at
            ),
        }
    }
    info!("event=scheduler_loop module=reminder status=stopped");
    engine
}

/// Start of the minute after the one containing `now`.
pub fn next_minute_boundary(now: NaiveDateTime) -> NaiveDateTime {
    truncate_to_minute(now) + ChronoDuration::minutes(1)
}

fn truncate_to_minute(value: NaiveDateTime) -> NaiveDateTime {
    value
        .with_second(0)
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::next_minute_boundary;
    use chrono::NaiveDate;

    #[test]
    fn next_boundary_is_second_zero_of_following_minute() {
        let day = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let mid_minute = day.and_hms_milli_opt(9, 0, 30, 500).unwrap();
        assert_eq!(
            next_minute_boundary(mid_minute),
            day.and_hms_opt(9, 1, 0).unwrap()
        );

        let on_boundary = day.and_hms_opt(9, 1, 0).unwrap();
        assert_eq!(
            next_minute_boundary(on_boundary),
            day.and_hms_opt(9, 2, 0).unwrap()
        );
    }

    #[test]
    fn next_boundary_rolls_over_midnight() {
        let late = NaiveDate::from_ymd_opt(2026, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(
            next_minute_boundary(late).to_string(),
            "2027-01-01 00:00:00"
        );
    }
}
