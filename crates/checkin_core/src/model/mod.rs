//! Domain model for daily check-in tasks.
//!
//! # Responsibility
//! - Define the records shared by the request layer and the reminder engine.
//! - Own the value types whose invariants hold by construction
//!   (`ReminderTime`, `DayWindow`).
//!
//! # Invariants
//! - Every task and check-in carries a stable UUID.
//! - All times are naive process-local datetimes; no timezone handling.

pub mod check_in;
pub mod day_window;
pub mod reminder_time;
pub mod task;
