// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{code::ErrorCode, SpamWardenResult};
use crate::modules::settings::duration::deserialize_duration;
use crate::modules::utils::net::split_host_port;
use crate::raise_error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_IMAPS_PORT: u16 = 993;
pub const DEFAULT_INBOX: &str = "INBOX";

/// Everything read from the YAML configuration file. Loaded once at startup and then
/// shared read-only with every account supervisor.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,
    /// Upper bound on accounts polling at the same time; `0` means unbounded.
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    pub accounts: Vec<Account>,
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Account {
    pub name: String,
    pub host: String,
    #[serde(default = "default_tls")]
    pub tls: bool,
    pub username: String,
    pub password: String,
    #[serde(default = "default_inbox")]
    pub inbox: String,
    pub spam_folder: String,
    #[serde(default)]
    pub search_unseen_only: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_command")]
    pub command: Vec<String>,
    #[serde(default = "default_spam_exit_code")]
    pub spam_exit_code: i32,
    #[serde(
        default = "default_classifier_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub timeout: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            command: default_classifier_command(),
            spam_exit_code: default_spam_exit_code(),
            timeout: default_classifier_timeout(),
        }
    }
}

fn default_tls() -> bool {
    true
}

fn default_inbox() -> String {
    DEFAULT_INBOX.into()
}

fn default_classifier_command() -> Vec<String> {
    ["docker", "exec", "-i", "spamassassin", "spamc", "-c"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_spam_exit_code() -> i32 {
    1
}

fn default_classifier_timeout() -> Duration {
    Duration::from_secs(60)
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("inbox", &self.inbox)
            .field("spam_folder", &self.spam_folder)
            .field("search_unseen_only", &self.search_unseen_only)
            .finish()
    }
}

impl Account {
    /// Host name and port to dial.
    pub fn endpoint(&self) -> SpamWardenResult<(String, u16)> {
        split_host_port(&self.host, DEFAULT_IMAPS_PORT)
    }

    fn validate(&self) -> SpamWardenResult<()> {
        let invalid = |what: &str| {
            raise_error!(
                format!("Account '{}': {}", self.name, what),
                ErrorCode::InvalidConfiguration
            )
        };

        if self.name.trim().is_empty() {
            return Err(raise_error!(
                "Account name cannot be empty".into(),
                ErrorCode::InvalidConfiguration
            ));
        }
        self.endpoint().map_err(|e| invalid(&e.to_string()))?;
        if !self.tls {
            return Err(invalid(
                "plaintext IMAP is not supported, set 'tls: true' and use an implicit TLS port",
            ));
        }
        if self.username.is_empty() {
            return Err(invalid("username cannot be empty"));
        }
        if self.inbox.trim().is_empty() {
            return Err(invalid("inbox cannot be empty"));
        }
        if self.spam_folder.trim().is_empty() {
            return Err(invalid("spam_folder cannot be empty"));
        }
        if self.spam_folder == self.inbox {
            return Err(invalid("spam_folder must differ from inbox"));
        }
        Ok(())
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> SpamWardenResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            raise_error!(
                format!(
                    "Failed to open config file '{}' (error: {})",
                    path.display(),
                    e
                ),
                ErrorCode::MissingConfiguration
            )
        })?;
        Self::parse(&contents).map_err(|e| {
            raise_error!(
                format!("Config file '{}': {}", path.display(), e),
                e.code()
            )
        })
    }

    pub fn parse(contents: &str) -> SpamWardenResult<Self> {
        let config: Config = serde_yaml::from_str(contents).map_err(|e| {
            raise_error!(
                format!("Failed to decode config file: {}", e),
                ErrorCode::InvalidConfiguration
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SpamWardenResult<()> {
        if self.poll_interval.is_zero() {
            return Err(raise_error!(
                "poll_interval must be greater than zero".into(),
                ErrorCode::InvalidConfiguration
            ));
        }
        if self.accounts.is_empty() {
            return Err(raise_error!(
                "No accounts configured".into(),
                ErrorCode::MissingConfiguration
            ));
        }
        if self.classifier.command.is_empty() || self.classifier.command[0].trim().is_empty() {
            return Err(raise_error!(
                "classifier.command cannot be empty".into(),
                ErrorCode::InvalidConfiguration
            ));
        }
        if self.classifier.spam_exit_code == 0 {
            return Err(raise_error!(
                "classifier.spam_exit_code cannot be 0, that is the not-spam exit code".into(),
                ErrorCode::InvalidConfiguration
            ));
        }
        if self.classifier.timeout.is_zero() {
            return Err(raise_error!(
                "classifier.timeout must be greater than zero".into(),
                ErrorCode::InvalidConfiguration
            ));
        }

        let mut names = HashSet::new();
        for account in &self.accounts {
            account.validate()?;
            if !names.insert(account.name.as_str()) {
                return Err(raise_error!(
                    format!("Duplicate account name '{}'", account.name),
                    ErrorCode::InvalidConfiguration
                ));
            }
        }
        Ok(())
    }
}
