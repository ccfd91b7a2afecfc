// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::classifier::{decide, parse_report, Classifier, Verdict};
use crate::modules::error::{code::ErrorCode, SpamWardenResult};
use crate::modules::settings::config::ClassifierConfig;
use crate::raise_error;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Runs an external `spamc -c` compatible command once per message.
///
/// The message is written to the child's stdin, which is then closed. The report is
/// stdout followed by stderr. Exit code 0 means "not spam", `spam_exit_code` means
/// "spam"; anything else is a failure.
#[derive(Clone, Debug)]
pub struct SpamcClassifier {
    program: String,
    args: Vec<String>,
    spam_exit_code: i32,
    timeout: Duration,
}

impl SpamcClassifier {
    pub fn new(config: &ClassifierConfig) -> SpamWardenResult<Self> {
        let (program, args) = config.command.split_first().ok_or_else(|| {
            raise_error!(
                "classifier.command cannot be empty".into(),
                ErrorCode::InvalidConfiguration
            )
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            spam_exit_code: config.spam_exit_code,
            timeout: config.timeout,
        })
    }

    async fn run(&self, raw: &[u8]) -> SpamWardenResult<Output> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                raise_error!(
                    format!("Failed to start classifier '{}': {}", self.program, e),
                    ErrorCode::ClassifierFailed
                )
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            raise_error!(
                "Classifier stdin is not available".into(),
                ErrorCode::ClassifierFailed
            )
        })?;
        let feed = async move {
            let written = stdin.write_all(raw).await;
            drop(stdin);
            written
        };

        let (written, output) = tokio::join!(feed, child.wait_with_output());
        written.map_err(|e| {
            raise_error!(
                format!("Failed to write message to classifier: {}", e),
                ErrorCode::ClassifierFailed
            )
        })?;
        output.map_err(|e| {
            raise_error!(
                format!("Failed to wait for classifier: {}", e),
                ErrorCode::ClassifierFailed
            )
        })
    }
}

impl Classifier for SpamcClassifier {
    async fn classify(&self, raw: &[u8]) -> SpamWardenResult<Verdict> {
        let output = match tokio::time::timeout(self.timeout, self.run(raw)).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(raise_error!(
                    format!("Classifier did not finish within {:?}", self.timeout),
                    ErrorCode::ClassifierTimeout
                ))
            }
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        let report = String::from_utf8_lossy(&combined);

        let signalled_spam = match output.status.code() {
            Some(0) => false,
            Some(code) if code == self.spam_exit_code => true,
            Some(code) => {
                return Err(raise_error!(
                    format!(
                        "Classifier exited with status {}: {}",
                        code,
                        report.trim()
                    ),
                    ErrorCode::ClassifierFailed
                ))
            }
            None => {
                return Err(raise_error!(
                    format!("Classifier was terminated by a signal: {}", report.trim()),
                    ErrorCode::ClassifierFailed
                ))
            }
        };

        let (score, threshold) = parse_report(&report)?;
        debug!(
            "Classifier report {}/{} (exit signal spam={})",
            score, threshold, signalled_spam
        );
        Ok(decide(signalled_spam, score, threshold))
    }
}
