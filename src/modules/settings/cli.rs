// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::{builder::ValueParser, Parser};
use std::{path::PathBuf, sync::LazyLock};
use tracing::Level;

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "spamwarden",
    about = "Polls IMAP mailboxes, scores new mail with SpamAssassin and moves spam into a quarantine folder.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// Path of the YAML file listing the accounts to watch (default: "config.yaml")
    #[clap(
        long,
        default_value = "config.yaml",
        env,
        help = "Set the path of the YAML configuration file"
    )]
    pub spamwarden_config: PathBuf,

    /// spamwarden log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for spamwarden (error, warn, info, debug, trace)",
        value_parser = ValueParser::new(|s: &str| {
            s.parse::<Level>().map_err(|_| {
                format!(
                    "Invalid log level '{}'. Use one of: error, warn, info, debug, trace.",
                    s
                )
            })
        })
    )]
    pub spamwarden_log_level: Level,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub spamwarden_ansi_logs: bool,

    /// Enable JSON logs (default: false)
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable JSON formatted logs"
    )]
    pub spamwarden_json_logs: bool,

    /// Enable log file output (default: false)
    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub spamwarden_log_to_file: bool,

    #[clap(
        long,
        default_value = "logs",
        env,
        help = "Set the directory for rotated log files"
    )]
    pub spamwarden_log_dir: PathBuf,

    /// Maximum number of log files (default: 5)
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of log files to keep",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub spamwarden_max_log_files: u16,

    #[clap(
        long,
        default_value = "false",
        help = "Validate the configuration file and exit"
    )]
    pub spamwarden_check_config: bool,
}

impl Settings {
    #[cfg(test)]
    fn new_for_test() -> Self {
        Self {
            spamwarden_config: PathBuf::from("config.yaml"),
            spamwarden_log_level: Level::INFO,
            spamwarden_ansi_logs: false,
            spamwarden_json_logs: false,
            spamwarden_log_to_file: false,
            spamwarden_log_dir: PathBuf::from("logs"),
            spamwarden_max_log_files: 5,
            spamwarden_check_config: false,
        }
    }
}
