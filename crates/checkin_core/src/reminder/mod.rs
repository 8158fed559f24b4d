//! Reminder scheduling and deduplication engine.
//!
//! # Responsibility
//! - Decide, once per minute, which tasks are due and not yet checked in.
//! - Dispatch one reminder per such task through an injected notifier.
//!
//! # Invariants
//! - Exact-minute matching only; no catch-up for missed minutes.
//! - The engine keeps no "reminder sent" state; the check-in window query is
//!   the only per-day dedupe.

pub mod clock;
pub mod evaluator;
pub mod notifier;
pub mod outbox;
pub mod scheduler;
pub mod store;
