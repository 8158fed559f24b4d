//! `checkin` command line entry point.
//!
//! # Responsibility
//! - Map subcommands onto core services over one SQLite connection.
//! - Host the reminder scheduler for `checkin run` until Ctrl-C.
//!
//! # Invariants
//! - Any failed operation, a rejected duplicate check-in included, exits
//!   with a non-zero status.

mod cli;

use checkin_core::db::open_db;
use checkin_core::{
    init_logging, AppConfig, CheckIn, CheckInService, Clock, EmailNotifier, LogSettings, NewTask,
    OutboxTransport, ReminderEngine, ReminderScheduler, ReminderTemplate, SqliteCheckInRepository,
    SqliteReminderStore, SqliteTaskRepository, SystemClock, Task, TaskPatch, TaskService,
};
use clap::Parser;
use cli::{Cli, Commands, TaskCommand};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&log_settings(&config, matches!(cli.command, Commands::Run))?)?;

    match cli.command {
        Commands::Task(command) => run_task_command(&config, command),
        Commands::CheckIn { task } => {
            let conn = open_db(&config.database_path)?;
            let service = CheckInService::new(SqliteCheckInRepository::try_new(&conn)?);
            let check_in = service.check_in(task, SystemClock.now())?;
            println!("checked in {} at {}", task, format_time(&check_in));
            Ok(())
        }
        Commands::CheckIns { task } => {
            let conn = open_db(&config.database_path)?;
            let service = CheckInService::new(SqliteCheckInRepository::try_new(&conn)?);
            for check_in in service.list_check_ins(task)? {
                println!("{}  {}", format_time(&check_in), check_in.id);
            }
            Ok(())
        }
        Commands::Today => {
            let conn = open_db(&config.database_path)?;
            let service = CheckInService::new(SqliteCheckInRepository::try_new(&conn)?);
            for check_in in service.list_today(SystemClock.now())? {
                println!("{}  {}", format_time(&check_in), check_in.task_id);
            }
            Ok(())
        }
        Commands::Run => run_scheduler(&config),
    }
}

fn run_task_command(config: &AppConfig, command: TaskCommand) -> CliResult<()> {
    let conn = open_db(&config.database_path)?;
    let service = task_service(&conn)?;

    match command {
        TaskCommand::Add {
            title,
            time,
            email,
            description,
        } => {
            let task = service.create_task(
                NewTask {
                    title,
                    description,
                    reminder_time: time,
                    email,
                },
                SystemClock.now(),
            )?;
            print_task(&task);
        }
        TaskCommand::List => {
            for task in service.list_tasks()? {
                print_task(&task);
            }
        }
        TaskCommand::Show { id } => {
            let task = service.get_task(id)?;
            print_task(&task);
            println!(
                "  description: {}",
                task.description.as_deref().unwrap_or("-")
            );
            println!("  created_at: {}", task.created_at.format("%Y-%m-%d %H:%M:%S"));
        }
        TaskCommand::Update {
            id,
            title,
            description,
            clear_description,
            time,
            email,
            active,
        } => {
            let description = if clear_description {
                Some(None)
            } else {
                description.map(Some)
            };
            let task = service.update_task(
                id,
                TaskPatch {
                    title,
                    description,
                    reminder_time: time,
                    email,
                    is_active: active,
                },
            )?;
            print_task(&task);
        }
        TaskCommand::Delete { id } => {
            service.delete_task(id)?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

fn task_service(conn: &Connection) -> CliResult<TaskService<SqliteTaskRepository<'_>>> {
    Ok(TaskService::new(SqliteTaskRepository::try_new(conn)?))
}

fn run_scheduler(config: &AppConfig) -> CliResult<()> {
    let transport = OutboxTransport::new(&config.outbox_dir)?;
    let template = match &config.email_template_path {
        Some(path) => ReminderTemplate::load(path)?,
        None => ReminderTemplate::builtin(),
    };
    let notifier = EmailNotifier::new(
        transport,
        config.sender_email.clone(),
        config.dispatch_timeout(),
    )
    .with_template(template);
    let store = SqliteReminderStore::open(&config.database_path)?;

    let mut scheduler = ReminderScheduler::new(ReminderEngine::new(store, notifier), SystemClock);
    scheduler.start()?;
    info!(
        "event=cli_run module=cli status=started database={} outbox={}",
        config.database_path.display(),
        config.outbox_dir.display()
    );
    eprintln!("reminder scheduler running; press Ctrl-C to stop");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let signal = runtime.block_on(tokio::signal::ctrl_c());

    scheduler.stop()?;
    signal?;
    info!("event=cli_run module=cli status=stopped");
    Ok(())
}

fn log_settings(config: &AppConfig, running: bool) -> CliResult<LogSettings> {
    let dir = match &config.log_dir {
        Some(dir) => Some(absolute(dir)?),
        None => None,
    };
    Ok(LogSettings {
        level: config.log_level.clone(),
        dir,
        echo_to_stderr: running,
    })
}

fn absolute(path: &Path) -> CliResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

fn print_task(task: &Task) {
    let state = if task.is_active { "active" } else { "paused" };
    println!(
        "{}  {}  {:<6}  {}  <{}>",
        task.id, task.reminder_time, state, task.title, task.email
    );
}

fn format_time(check_in: &CheckIn) -> String {
    check_in
        .checked_in_at
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
