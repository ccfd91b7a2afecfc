use crate::modules::logger::LocalTimer;
use crate::modules::settings::cli::SETTINGS;
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

pub static LOG_WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn setup_file_logger() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = SETTINGS.spamwarden_log_level;

    let (writer, guard) = server_log_writer()?;
    // Dropping the guard would stop the background writer.
    let _ = LOG_WORKER_GUARD.set(guard);

    let server_layer = fmt::layer()
        .with_timer(LocalTimer)
        .with_ansi(false)
        .with_level(true)
        .with_writer(writer)
        .with_target(true);

    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(server_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn server_log_writer(
) -> Result<(NonBlocking, WorkerGuard), tracing_appender::rolling::InitError> {
    let rolling = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("spamwarden")
        .filename_suffix("log")
        .max_log_files(SETTINGS.spamwarden_max_log_files as usize)
        .build(&SETTINGS.spamwarden_log_dir)?;
    Ok(tracing_appender::non_blocking(rolling))
}
