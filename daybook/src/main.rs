//! `daybook` — print the day's tasks and notes.
//!
//! Opens the task and note databases under the data directory, loads the
//! task mirror and prints a read-only report. Configuration via CLI flags,
//! environment variables, or config file (`~/.config/daybook/config.toml`).
//!
//! ```bash
//! # Today's tasks from the default data directory
//! cargo run --bin daybook
//!
//! # A specific day from a custom directory, with debug logs in a file
//! cargo run --bin daybook -- --data-dir ./data --date 2025-05-01 \
//!     --log-level debug --log-file /tmp/daybook.log
//! ```

use std::path::Path;

use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use daybook::config::{CliArgs, DaybookConfig};
use daybook::notes::NoteStore;
use daybook::store::{Database, SqliteTaskStore};
use daybook::tasks::{TaskManager, TaskSnapshot};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    let config = match DaybookConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(data_dir = %config.data_dir.display(), "daybook starting");

    let day = cli.date.unwrap_or_else(|| Utc::now().date_naive());
    if let Err(e) = run(&config, day).await {
        tracing::error!(error = %e, "daybook failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Initialize logging.
///
/// With a log file, entries go through a non-blocking file writer and the
/// returned [`WorkerGuard`] must be held until shutdown so buffered entries
/// are flushed. Without one, logs go to stderr so stdout stays clean for
/// the report.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some((log_dir, file_name)) = file_path.and_then(|p| Some((p.parent()?, p.file_name()?)))
    else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
        return None;
    };

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Store(#[from] daybook::store::StoreError),
    #[error(transparent)]
    Tasks(#[from] daybook::tasks::TaskError),
}

async fn run(config: &DaybookConfig, day: NaiveDate) -> Result<(), RunError> {
    let tasks_db = Database::open(config.tasks_db_path(), config.busy_timeout)?;
    let notes_db = Database::open(config.notes_db_path(), config.busy_timeout)?;

    let manager = TaskManager::start(SqliteTaskStore::new(tasks_db))
        .await?
        .with_max_title_len(config.max_title_len);

    let notes = NoteStore::new(notes_db);
    notes.initialize().await?;
    let note_count = notes.list().await?.len();

    print_report(&manager.snapshot(), day, note_count);
    Ok(())
}

fn print_report(snapshot: &TaskSnapshot, day: NaiveDate, note_count: usize) {
    let scheduled = snapshot.scheduled_on(day);
    println!("{day}");
    if scheduled.is_empty() {
        println!("  no tasks scheduled");
    }
    for task in scheduled {
        let mark = if task.is_in_progress() { ' ' } else { 'x' };
        println!(
            "  [{mark}] #{} {} ({})",
            task.id,
            task.title,
            task.priority.as_str()
        );
        if let Some(desc) = &task.description {
            println!("        {desc}");
        }
    }
    println!(
        "{} in progress of {} tasks, {note_count} notes",
        snapshot.in_progress_count(),
        snapshot.len()
    );
}
