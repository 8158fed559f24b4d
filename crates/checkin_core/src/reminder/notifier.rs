//! Reminder dispatch boundary.
//!
//! # Responsibility
//! - Define the single-attempt `Notifier` contract the scheduler calls.
//! - Compose reminder emails from a task and hand them to a `MailTransport`.
//! - Bound every send with a timeout so a hung transport cannot stall the
//!   per-minute cadence.
//!
//! # Invariants
//! - One `attempt_notify` call performs at most one transport send.
//! - No retry is scheduled here; failures are returned to the caller.
//! - A send that outlives its timeout is reported as failed but is not
//!   cancelled: it may still deliver later. `outstanding_sends()` counts such
//!   sends until they finish.

use crate::model::task::Task;
use crossbeam_channel::RecvTimeoutError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const BUILTIN_TEMPLATE: &str = include_str!("../../templates/reminder_email.html");
const MISSING_DESCRIPTION: &str = "none";

/// Delivery failure reported by a [`MailTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for TransportError {}

/// Why a notification attempt failed.
#[derive(Debug)]
pub enum NotifyError {
    Transport(TransportError),
    TimedOut(Duration),
    /// The dispatch worker ended without reporting a result.
    WorkerLost,
    Spawn(std::io::Error),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "transport failed: {err}"),
            Self::TimedOut(timeout) => {
                write!(f, "dispatch timed out after {}ms", timeout.as_millis())
            }
            Self::WorkerLost => write!(f, "dispatch worker exited without a result"),
            Self::Spawn(err) => write!(f, "failed to spawn dispatch worker: {err}"),
        }
    }
}

impl Error for NotifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for NotifyError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

/// Best-effort, single-attempt reminder delivery.
pub trait Notifier {
    fn attempt_notify(&self, task: &Task) -> Result<(), NotifyError>;

    /// Sends started by earlier attempts that have not finished yet.
    fn outstanding_sends(&self) -> usize {
        0
    }
}

/// A rendered reminder ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Outbound mail boundary (SMTP, HTTP API, local outbox, ...).
pub trait MailTransport: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError>;
}

/// HTML body template with `{{ task_title }}`, `{{ reminder_time }}` and
/// `{{ task_description }}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderTemplate {
    html: String,
}

impl ReminderTemplate {
    pub fn builtin() -> Self {
        Self {
            html: BUILTIN_TEMPLATE.to_string(),
        }
    }

    pub fn from_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        std::fs::read_to_string(path).map(Self::from_html)
    }

    /// Substitutes task fields, HTML-escaped, into the template.
    pub fn render(&self, task: &Task) -> String {
        let description = task
            .description
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(MISSING_DESCRIPTION);
        self.html
            .replace("{{ task_title }}", &escape_html(&task.title))
            .replace("{{ reminder_time }}", &task.reminder_time.to_string())
            .replace("{{ task_description }}", &escape_html(description))
    }
}

impl Default for ReminderTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

/// [`Notifier`] that emails the task's address through a [`MailTransport`].
pub struct EmailNotifier<T: MailTransport + 'static> {
    transport: Arc<T>,
    sender: String,
    template: ReminderTemplate,
    timeout: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl<T: MailTransport + 'static> EmailNotifier<T> {
    pub fn new(transport: T, sender: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport: Arc::new(transport),
            sender: sender.into(),
            template: ReminderTemplate::builtin(),
            timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_template(mut self, template: ReminderTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Builds the message for `task` without sending it.
    pub fn compose(&self, task: &Task) -> OutgoingEmail {
        OutgoingEmail {
            from: self.sender.clone(),
            to: task.email.clone(),
            subject: format!("Check-in reminder - {}", task.title),
            html_body: self.template.render(task),
        }
    }
}

impl<T: MailTransport + 'static> Notifier for EmailNotifier<T> {
    fn attempt_notify(&self, task: &Task) -> Result<(), NotifyError> {
        let email = self.compose(task);
        let transport = Arc::clone(&self.transport);
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let guard = InFlight::enter(&self.in_flight);

        // A send that outlives the timeout keeps running detached; its result
        // is dropped with the channel.
        thread::Builder::new()
            .name("reminder-dispatch".to_string())
            .spawn(move || {
                let result = transport.send(&email);
                drop(guard);
                let _ = result_tx.send(result);
            })
            .map_err(NotifyError::Spawn)?;

        match result_rx.recv_timeout(self.timeout) {
            Ok(result) => result.map_err(NotifyError::from),
            Err(RecvTimeoutError::Timeout) => Err(NotifyError::TimedOut(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(NotifyError::WorkerLost),
        }
    }

    fn outstanding_sends(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Counts a dispatch worker until it is dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{
        EmailNotifier, MailTransport, Notifier, NotifyError, OutgoingEmail, ReminderTemplate,
        TransportError,
    };
    use crate::model::reminder_time::ReminderTime;
    use crate::model::task::Task;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CapturingTransport {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl MailTransport for CapturingTransport {
        fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    struct FailingTransport;

    impl MailTransport for FailingTransport {
        fn send(&self, _email: &OutgoingEmail) -> Result<(), TransportError> {
            Err(TransportError::new("535 authentication failed"))
        }
    }

    struct SlowTransport;

    impl MailTransport for SlowTransport {
        fn send(&self, _email: &OutgoingEmail) -> Result<(), TransportError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        }
    }

    fn task() -> Task {
        let created = NaiveDate::from_ymd_opt(2026, 4, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        Task::new(
            "Read <10> pages",
            ReminderTime::parse("21:30").unwrap(),
            "reader@example.com",
            created,
        )
    }

    #[test]
    fn render_fills_placeholders_and_defaults_description() {
        let template = ReminderTemplate::from_html(
            "{{ task_title }}|{{ reminder_time }}|{{ task_description }}",
        );
        let mut task = task();
        assert_eq!(template.render(&task), "Read &lt;10&gt; pages|21:30|none");

        task.description = Some("fiction only".to_string());
        assert_eq!(
            template.render(&task),
            "Read &lt;10&gt; pages|21:30|fiction only"
        );
    }

    #[test]
    fn builtin_template_contains_all_placeholders() {
        let rendered = ReminderTemplate::builtin().render(&task());
        assert!(!rendered.contains("{{"));
        assert!(rendered.contains("21:30"));
    }

    #[test]
    fn compose_addresses_task_email_with_subject() {
        let notifier = EmailNotifier::new(
            CapturingTransport::default(),
            "reminders@example.com",
            Duration::from_secs(1),
        );
        let email = notifier.compose(&task());
        assert_eq!(email.from, "reminders@example.com");
        assert_eq!(email.to, "reader@example.com");
        assert_eq!(email.subject, "Check-in reminder - Read <10> pages");
    }

    #[test]
    fn attempt_notify_sends_exactly_once() {
        let notifier = EmailNotifier::new(
            CapturingTransport::default(),
            "reminders@example.com",
            Duration::from_secs(5),
        );
        notifier.attempt_notify(&task()).unwrap();
        assert_eq!(notifier.transport().sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn attempt_notify_surfaces_transport_failure() {
        let notifier =
            EmailNotifier::new(FailingTransport, "reminders@example.com", Duration::from_secs(5));
        let err = notifier.attempt_notify(&task()).unwrap_err();
        assert!(matches!(err, NotifyError::Transport(ref inner) if inner.message().contains("535")));
    }

    #[test]
    fn attempt_notify_times_out_on_hung_transport() {
        let notifier =
            EmailNotifier::new(SlowTransport, "reminders@example.com", Duration::from_millis(20));
        let err = notifier.attempt_notify(&task()).unwrap_err();
        assert!(matches!(err, NotifyError::TimedOut(_)));
    }

    #[test]
    fn timed_out_send_stays_outstanding_until_it_finishes() {
        let notifier =
            EmailNotifier::new(SlowTransport, "reminders@example.com", Duration::from_millis(20));
        assert_eq!(notifier.outstanding_sends(), 0);

        notifier.attempt_notify(&task()).unwrap_err();
        assert_eq!(notifier.outstanding_sends(), 1);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while notifier.outstanding_sends() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(notifier.outstanding_sends(), 0);
    }

    #[test]
    fn completed_send_is_not_outstanding() {
        let notifier = EmailNotifier::new(
            CapturingTransport::default(),
            "reminders@example.com",
            Duration::from_secs(5),
        );
        notifier.attempt_notify(&task()).unwrap();
        assert_eq!(notifier.outstanding_sends(), 0);
    }
}
