mod common;

use checkin_core::db::open_db_in_memory;
use checkin_core::{
    CheckIn, CheckInRepository, DayWindow, NewTask, RepoError, RepoResult, ReminderEngine,
    ReminderStore, SqliteCheckInRepository, SqliteReminderStore, SqliteTaskRepository, Task,
    TaskId, TaskPatch, TaskService, TickReport,
};
use chrono::{Duration, NaiveDateTime};
use common::{at, RecordingNotifier};
use rusqlite::Connection;

fn add_task(conn: &Connection, title: &str, reminder_time: &str) -> Task {
    TaskService::new(SqliteTaskRepository::try_new(conn).unwrap())
        .create_task(
            NewTask {
                title: title.to_string(),
                description: None,
                reminder_time: reminder_time.to_string(),
                email: "me@example.com".to_string(),
            },
            at(6, 0, 0),
        )
        .unwrap()
}

fn engine_with(
    conn: Connection,
) -> (
    ReminderEngine<SqliteReminderStore, RecordingNotifier>,
    RecordingNotifier,
) {
    let notifier = RecordingNotifier::default();
    let engine = ReminderEngine::new(SqliteReminderStore::from_connection(conn), notifier.clone());
    (engine, notifier)
}

fn check_in(
    engine: &ReminderEngine<SqliteReminderStore, RecordingNotifier>,
    task: &Task,
    when: NaiveDateTime,
) {
    SqliteCheckInRepository::try_new(engine.store().connection())
        .unwrap()
        .insert_check_in(task.id, when)
        .unwrap();
}

#[test]
fn due_task_without_check_in_is_notified_once() {
    let conn = open_db_in_memory().unwrap();
    let task = add_task(&conn, "Stretch", "09:00");
    let (engine, notifier) = engine_with(conn);

    let report = engine.run_tick(at(9, 0, 0)).unwrap();

    assert_eq!(
        report,
        TickReport {
            scanned: 1,
            due: 1,
            notified: 1,
            ..TickReport::default()
        }
    );
    assert_eq!(notifier.sent(), vec![task.id]);
}

#[test]
fn task_checked_in_earlier_today_is_not_notified() {
    let conn = open_db_in_memory().unwrap();
    let task = add_task(&conn, "Stretch", "09:00");
    let (engine, notifier) = engine_with(conn);
    check_in(&engine, &task, at(8, 30, 0));

    let report = engine.run_tick(at(9, 0, 0)).unwrap();

    assert_eq!(report.due, 1);
    assert_eq!(report.satisfied, 1);
    assert_eq!(report.notified, 0);
    assert!(notifier.sent().is_empty());
}

#[test]
fn inactive_task_is_never_notified() {
    let conn = open_db_in_memory().unwrap();
    let task = add_task(&conn, "Stretch", "09:00");
    TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap())
        .update_task(
            task.id,
            TaskPatch {
                is_active: Some(false),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    let (engine, notifier) = engine_with(conn);

    let report = engine.run_tick(at(9, 0, 0)).unwrap();

    assert_eq!(report.scanned, 0);
    assert!(notifier.sent().is_empty());
}

#[test]
fn missed_minute_is_not_caught_up_later_that_day() {
    let conn = open_db_in_memory().unwrap();
    add_task(&conn, "Stretch", "09:00");
    let (engine, notifier) = engine_with(conn);

    for minute in 1..60 {
        engine.run_tick(at(9, minute, 0)).unwrap();
    }
    engine.run_tick(at(23, 59, 0)).unwrap();

    assert!(notifier.sent().is_empty());
}

#[test]
fn satisfied_task_stays_quiet_on_every_tick_that_day() {
    let conn = open_db_in_memory().unwrap();
    let task = add_task(&conn, "Stretch", "09:00");
    let (engine, notifier) = engine_with(conn);
    check_in(&engine, &task, at(0, 0, 0));

    for second in [0, 15, 30, 59] {
        let report = engine.run_tick(at(9, 0, second)).unwrap();
        assert_eq!(report.satisfied, 1);
    }
    assert!(notifier.sent().is_empty());
}

#[test]
fn check_in_from_yesterday_does_not_satisfy_today() {
    let conn = open_db_in_memory().unwrap();
    let task = add_task(&conn, "Stretch", "09:00");
    let (engine, notifier) = engine_with(conn);
    check_in(&engine, &task, at(23, 59, 59) - Duration::days(1));

    engine.run_tick(at(9, 0, 0)).unwrap();

    assert_eq!(notifier.sent(), vec![task.id]);
}

#[test]
fn pending_set_is_stable_within_a_minute() {
    let conn = open_db_in_memory().unwrap();
    let due = add_task(&conn, "Due", "09:00");
    add_task(&conn, "Later", "09:01");
    let (engine, _notifier) = engine_with(conn);

    let first: Vec<_> = engine
        .pending_reminders(at(9, 0, 5))
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect();
    let second: Vec<_> = engine
        .pending_reminders(at(9, 0, 50))
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect();

    assert_eq!(first, vec![due.id]);
    assert_eq!(first, second);
}

#[test]
fn dispatch_failure_for_one_task_does_not_block_others() {
    let conn = open_db_in_memory().unwrap();
    let failing = add_task(&conn, "Failing", "09:00");
    let healthy = add_task(&conn, "Healthy", "09:00");
    let (engine, notifier) = engine_with(conn);
    notifier.fail_for(failing.id);

    let report = engine.run_tick(at(9, 0, 0)).unwrap();

    assert_eq!(report.due, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(notifier.sent(), vec![healthy.id]);
}

#[test]
fn malformed_schedule_row_is_never_due_and_does_not_abort_tick() {
    let conn = open_db_in_memory().unwrap();
    let task = add_task(&conn, "Valid", "09:00");
    conn.execute(
        "INSERT INTO tasks (id, title, description, reminder_time, email, is_active, created_at)
         VALUES ('5f0c6a2e-8d1b-4b53-9d8e-0a6f2f0f7c11', 'Broken', NULL, '9am', 'me@example.com', 1,
                 '2026-10-19 06:00:00.000000');",
        [],
    )
    .unwrap();
    let (engine, notifier) = engine_with(conn);

    let report = engine.run_tick(at(9, 0, 0)).unwrap();

    assert_eq!(report.scanned, 1);
    assert_eq!(notifier.sent(), vec![task.id]);
}

#[test]
fn panicking_notifier_is_counted_as_failure_for_that_task_only() {
    let conn = open_db_in_memory().unwrap();
    let crashing = add_task(&conn, "Crashing", "09:00");
    let healthy = add_task(&conn, "Healthy", "09:00");
    let (engine, notifier) = engine_with(conn);
    notifier.panic_for(crashing.id);

    let report = engine.run_tick(at(9, 0, 0)).unwrap();

    assert_eq!(report.due, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(notifier.sent(), vec![healthy.id]);
    assert_eq!(notifier.attempted().len(), 2);
}

struct FlakyStore {
    inner: SqliteReminderStore,
    unreadable: TaskId,
}

impl ReminderStore for FlakyStore {
    fn list_active_tasks(&self) -> RepoResult<Vec<Task>> {
        self.inner.list_active_tasks()
    }

    fn find_check_in(&self, task_id: TaskId, window: &DayWindow) -> RepoResult<Option<CheckIn>> {
        if task_id == self.unreadable {
            return Err(RepoError::InvalidData("disk I/O error".to_string()));
        }
        self.inner.find_check_in(task_id, window)
    }
}

#[test]
fn store_read_failure_skips_only_the_affected_task() {
    let conn = open_db_in_memory().unwrap();
    let unreadable = add_task(&conn, "Unreadable", "09:00");
    let readable = add_task(&conn, "Readable", "09:00");
    let notifier = RecordingNotifier::default();
    let engine = ReminderEngine::new(
        FlakyStore {
            inner: SqliteReminderStore::from_connection(conn),
            unreadable: unreadable.id,
        },
        notifier.clone(),
    );

    let report = engine.run_tick(at(9, 0, 0)).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(notifier.sent(), vec![readable.id]);
}

struct OfflineStore;

impl ReminderStore for OfflineStore {
    fn list_active_tasks(&self) -> RepoResult<Vec<Task>> {
        Err(RepoError::InvalidData("database is locked".to_string()))
    }

    fn find_check_in(&self, _task_id: TaskId, _window: &DayWindow) -> RepoResult<Option<CheckIn>> {
        Ok(None)
    }
}

#[test]
fn active_task_list_failure_aborts_the_tick() {
    let notifier = RecordingNotifier::default();
    let engine = ReminderEngine::new(OfflineStore, notifier.clone());

    assert!(engine.run_tick(at(9, 0, 0)).is_err());
    assert!(notifier.sent().is_empty());
}
