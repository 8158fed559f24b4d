//! Request-layer use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into task and check-in use-cases.
//! - Keep the CLI decoupled from SQL details.

pub mod check_in_service;
pub mod task_service;
