// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::classifier::Classifier;
use crate::modules::common::signal::Shutdown;
use crate::modules::error::SpamWardenResult;
use crate::modules::imap::connection::Connection;
use crate::modules::imap::executor::MailboxSession;
use crate::modules::imap::fetch::{fetch_candidate, FetchOutcome, FETCH_TIMEOUT};
use crate::modules::imap::mover::{move_message, MoveStrategy};
use crate::modules::imap::search::{scan, SearchMode};
use crate::modules::settings::config::Account;
use chrono::Utc;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What one pass looks at and where spam goes.
#[derive(Clone, Debug)]
pub struct PassPlan<'a> {
    pub inbox: &'a str,
    pub spam_folder: &'a str,
    pub mode: SearchMode,
    pub fetch_timeout: Duration,
}

impl<'a> PassPlan<'a> {
    pub fn for_account(account: &'a Account) -> Self {
        Self {
            inbox: &account.inbox,
            spam_folder: &account.spam_folder,
            mode: SearchMode::for_account(account),
            fetch_timeout: FETCH_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub processed: usize,
    pub spam: usize,
    pub moved: usize,
    pub skipped: usize,
    pub classifier_errors: usize,
    pub move_errors: usize,
    /// Shutdown was requested before every candidate was handled.
    pub interrupted: bool,
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} spam={} moved={} skipped={} classifier_errors={} move_errors={}",
            self.processed,
            self.spam,
            self.moved,
            self.skipped,
            self.classifier_errors,
            self.move_errors
        )
    }
}

/// Scans, classifies and quarantines once.
///
/// Per-message failures are counted and the pass moves on. A search failure or a lost
/// connection ends the pass with `Err`. A fetch timeout only taints the connection; the
/// caller decides whether to reconnect afterwards.
pub async fn run_pass<S, C>(
    connection: &mut Connection<S>,
    classifier: &C,
    plan: &PassPlan<'_>,
    shutdown: &Shutdown,
) -> SpamWardenResult<PassSummary>
where
    S: MailboxSession,
    C: Classifier,
{
    let mut summary = PassSummary::default();
    let candidates = scan(connection, plan.inbox, plan.mode, Utc::now()).await?;
    if candidates.is_empty() {
        debug!("No candidates in '{}'", plan.inbox);
        return Ok(summary);
    }
    info!("Found {} candidate(s) in '{}'", candidates.len(), plan.inbox);

    for uid in candidates {
        if shutdown.is_triggered() {
            summary.interrupted = true;
            break;
        }
        summary.processed += 1;

        let message = match fetch_candidate(connection, uid, plan.fetch_timeout).await {
            FetchOutcome::Delivered(message) => message,
            FetchOutcome::Missing => {
                warn!("UID {} returned no body, skipping", uid);
                summary.skipped += 1;
                continue;
            }
            FetchOutcome::Failed(e) if e.requires_reconnect() => return Err(e),
            FetchOutcome::Failed(e) => {
                warn!("Failed to fetch UID {}: {}", uid, e);
                summary.skipped += 1;
                continue;
            }
            FetchOutcome::TimedOut(_) => {
                summary.skipped += 1;
                continue;
            }
        };
        debug!("Fetched UID {} ({} bytes)", uid, message.size());

        let verdict = match classifier.classify(&message.raw).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Failed to classify UID {}: {}", uid, e);
                summary.classifier_errors += 1;
                continue;
            }
        };
        info!(
            "UID {}: score {}/{} spam={}",
            uid, verdict.score, verdict.threshold, verdict.is_spam
        );
        if !verdict.is_spam {
            continue;
        }
        summary.spam += 1;

        match move_message(connection, uid, plan.spam_folder).await {
            Ok(MoveStrategy::Native) => {
                summary.moved += 1;
                info!("Moved UID {} to '{}'", uid, plan.spam_folder);
            }
            Ok(MoveStrategy::CopyAndExpunge { expunged }) => {
                summary.moved += 1;
                info!(
                    "Copied UID {} to '{}' and expunged {} message(s)",
                    uid,
                    plan.spam_folder,
                    expunged.len()
                );
            }
            Err(e) if e.requires_reconnect() => return Err(e),
            Err(e) => {
                warn!("Failed to move UID {} to '{}': {}", uid, plan.spam_folder, e);
                summary.move_errors += 1;
            }
        }
    }

    info!("Pass finished: {}", summary);
    Ok(summary)
}
