use std::path::PathBuf;

use checkin_core::TaskId;
use clap::{Parser, Subcommand};

/// Daily check-in tasks with emailed reminders.
#[derive(Parser)]
#[command(name = "checkin", version, about = "Daily check-in reminders")]
pub struct Cli {
    /// TOML config file; `CHECKIN_*` variables override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskCommand),

    /// Record today's check-in for a task.
    CheckIn {
        task: TaskId,
    },

    /// Show the check-in history of a task, newest first.
    CheckIns {
        task: TaskId,
    },

    /// Show every check-in recorded today.
    Today,

    /// Run the reminder scheduler until Ctrl-C.
    Run,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create an active task.
    Add {
        title: String,
        /// Daily reminder time as HH:MM.
        #[arg(long)]
        time: String,
        /// Reminder recipient.
        #[arg(long)]
        email: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// List tasks, newest first.
    List,

    /// Show one task.
    Show {
        id: TaskId,
    },

    /// Change fields of a task.
    Update {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        /// New reminder time as HH:MM.
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// `true` to resume reminders, `false` to pause them.
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a task and its check-ins.
    Delete {
        id: TaskId,
    },
}
