use crate::modules::error::{code::ErrorCode, SpamWardenResult};
use crate::modules::logger::file::setup_file_logger;
use crate::modules::settings::cli::SETTINGS;
use crate::raise_error;
use chrono::Local;
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

mod file;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

pub fn initialize_logging() -> SpamWardenResult<()> {
    let result = if SETTINGS.spamwarden_log_to_file {
        setup_file_logger()
    } else {
        setup_stdout_logger().map_err(Into::into)
    };
    result.map_err(|e| {
        raise_error!(
            format!("Failed to install the log subscriber: {}", e),
            ErrorCode::InternalError
        )
    })
}

fn setup_stdout_logger() -> Result<(), tracing::dispatcher::SetGlobalDefaultError> {
    let level = SETTINGS.spamwarden_log_level;
    let with_ansi = SETTINGS.spamwarden_ansi_logs;

    if SETTINGS.spamwarden_json_logs {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(level)
            .with_timer(LocalTimer)
            .with_current_span(true)
            .with_writer(std::io::stdout)
            .finish();
        return tracing::subscriber::set_global_default(subscriber);
    }

    let format = tracing_subscriber::fmt::format()
        .with_level(true)
        .with_target(true)
        .with_timer(LocalTimer);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(with_ansi)
        .with_writer(std::io::stdout)
        .event_format(format)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
