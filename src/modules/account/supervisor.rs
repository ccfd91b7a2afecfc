// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::pass::{run_pass, PassPlan};
use crate::modules::classifier::Classifier;
use crate::modules::common::parallel::PassLimiter;
use crate::modules::common::signal::Shutdown;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::SpamWardenError;
use crate::modules::imap::connection::{connect_with_retry, ConnectOutcome, Connection, Connector};
use crate::modules::imap::retry::{FixedBackoff, RetryDecision, RetryPolicy};
use crate::modules::settings::config::Account;
use crate::{raise_error, run_with_timeout};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Pause after a failed pass before waiting for the next tick.
pub const PASS_ERROR_DELAY: Duration = Duration::from_secs(5);

const LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Disconnected,
    Connecting,
    Authenticating,
    Selecting,
    Polling,
    Cancelled,
    Fatal,
}

#[derive(Debug)]
pub enum SupervisorOutcome {
    Cancelled,
    Fatal(SpamWardenError),
}

enum PollExit<S> {
    Reconnect,
    Cancelled(Connection<S>),
}

/// Owns one account for the life of the process: its connection, its poll cadence and
/// its failures. Supervisors never share mutable state with each other.
pub struct AccountSupervisor<C: Connector, K: Classifier> {
    account: Account,
    poll_interval: Duration,
    connector: C,
    classifier: Arc<K>,
    limiter: PassLimiter,
    retry: Box<dyn RetryPolicy>,
    shutdown: Shutdown,
    stage: Stage,
    /// Sessions dropped since the account last reached Polling.
    reconnect_attempt: u32,
    last_pass: Option<Instant>,
}

impl<C, K> AccountSupervisor<C, K>
where
    C: Connector + 'static,
    K: Classifier + 'static,
{
    pub fn new(
        account: Account,
        poll_interval: Duration,
        connector: C,
        classifier: Arc<K>,
        limiter: PassLimiter,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            account,
            poll_interval,
            connector,
            classifier,
            limiter,
            retry: Box::new(FixedBackoff::default()),
            shutdown,
            stage: Stage::Disconnected,
            reconnect_attempt: 0,
            last_pass: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Box::new(policy);
        self
    }

    fn transition(&mut self, next: Stage) {
        debug!("{:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    fn fatal(&mut self, error: SpamWardenError) -> SupervisorOutcome {
        error!(
            "Account '{}' stopped: {} (code {:?})",
            self.account.name,
            error,
            error.code()
        );
        self.transition(Stage::Fatal);
        SupervisorOutcome::Fatal(error)
    }

    /// The server dropped a session after the dial succeeded. Waits out the retry policy
    /// before the next dial, so a server that hangs up on LOGIN is not hammered.
    async fn redial_after(&mut self, error: SpamWardenError) -> Option<SupervisorOutcome> {
        self.reconnect_attempt += 1;
        match self.retry.next(self.reconnect_attempt, &error) {
            RetryDecision::GiveUp => return Some(self.fatal(error)),
            RetryDecision::RetryAfter(delay) => {
                warn!(
                    "Session dropped (attempt {}): {}. Reconnecting in {:?}",
                    self.reconnect_attempt, error, delay
                );
                let waited =
                    Self::until_shutdown(&mut self.shutdown, tokio::time::sleep(delay)).await;
                match waited {
                    Some(()) => self.transition(Stage::Connecting),
                    None => self.transition(Stage::Cancelled),
                }
            }
        }
        None
    }

    /// Runs until shutdown or an unrecoverable error.
    pub async fn run(mut self) -> SupervisorOutcome {
        let span = info_span!("account", name = %self.account.name);
        async move { self.drive().await }.instrument(span).await
    }

    /// Races `task` against shutdown; `None` means shutdown won.
    async fn until_shutdown<T>(shutdown: &mut Shutdown, task: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = shutdown.recv() => None,
            value = task => Some(value),
        }
    }

    async fn drive(&mut self) -> SupervisorOutcome {
        let mut client: Option<C::Client> = None;
        let mut connection: Option<Connection<C::Session>> = None;

        loop {
            match self.stage {
                Stage::Disconnected => {
                    info!("Starting supervisor for {}", self.account.username);
                    self.transition(Stage::Connecting);
                }
                Stage::Connecting => {
                    connection = None;
                    let outcome = connect_with_retry(
                        &self.connector,
                        &self.account,
                        self.retry.as_ref(),
                        &mut self.shutdown,
                    )
                    .await;
                    match outcome {
                        ConnectOutcome::Connected(dialed) => {
                            client = Some(dialed);
                            self.transition(Stage::Authenticating);
                        }
                        ConnectOutcome::Cancelled => self.transition(Stage::Cancelled),
                        ConnectOutcome::GaveUp(e) => return self.fatal(e),
                    }
                }
                Stage::Authenticating => {
                    let Some(dialed) = client.take() else {
                        self.transition(Stage::Connecting);
                        continue;
                    };
                    let login = self.connector.login(
                        dialed,
                        &self.account.username,
                        &self.account.password,
                    );
                    let Some(result) = Self::until_shutdown(&mut self.shutdown, login).await else {
                        self.transition(Stage::Cancelled);
                        continue;
                    };
                    match result {
                        Ok(session) => {
                            info!("Logged in as {}", self.account.username);
                            let mut fresh = Connection::new(session);
                            if let Err(e) = fresh.refresh_capabilities().await {
                                if e.requires_reconnect() {
                                    warn!("Connection lost while querying capabilities");
                                    if let Some(outcome) = self.redial_after(e).await {
                                        return outcome;
                                    }
                                    continue;
                                }
                                warn!("CAPABILITY failed, will retry on demand: {}", e);
                            }
                            connection = Some(fresh);
                            self.transition(Stage::Selecting);
                        }
                        Err(e) if e.requires_reconnect() => {
                            warn!("Connection lost during login");
                            if let Some(outcome) = self.redial_after(e).await {
                                return outcome;
                            }
                        }
                        Err(e) => return self.fatal(e),
                    }
                }
                Stage::Selecting => {
                    let Some(live) = connection.as_mut() else {
                        self.transition(Stage::Connecting);
                        continue;
                    };
                    let select = live.select(&self.account.inbox);
                    let Some(result) = Self::until_shutdown(&mut self.shutdown, select).await
                    else {
                        self.transition(Stage::Cancelled);
                        continue;
                    };
                    match result {
                        Ok(info) => {
                            info!("Selected '{}' ({} messages)", info.name, info.exists);
                            self.reconnect_attempt = 0;
                            self.transition(Stage::Polling);
                        }
                        Err(e) if e.requires_reconnect() => {
                            warn!("Connection lost during select");
                            connection = None;
                            if let Some(outcome) = self.redial_after(e).await {
                                return outcome;
                            }
                        }
                        Err(e) => return self.fatal(e),
                    }
                }
                Stage::Polling => {
                    let Some(live) = connection.take() else {
                        self.transition(Stage::Connecting);
                        continue;
                    };
                    match self.poll(live).await {
                        PollExit::Reconnect => self.transition(Stage::Connecting),
                        PollExit::Cancelled(live) => {
                            connection = Some(live);
                            self.transition(Stage::Cancelled);
                        }
                    }
                }
                Stage::Cancelled => {
                    if let Some(live) = connection.take() {
                        Self::logout(live).await;
                    }
                    info!("Supervisor for '{}' stopped", self.account.name);
                    return SupervisorOutcome::Cancelled;
                }
                Stage::Fatal => {
                    return SupervisorOutcome::Fatal(raise_error!(
                        "supervisor entered the fatal stage without an error".into(),
                        ErrorCode::InternalError
                    ))
                }
            }
        }
    }

    async fn poll(&mut self, mut connection: Connection<C::Session>) -> PollExit<C::Session> {
        // the cadence outlives the connection: a reconnect never brings the next pass forward
        let start = self
            .last_pass
            .map_or_else(Instant::now, |at| at + self.poll_interval);
        let mut ticker = tokio::time::interval_at(start, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let plan = PassPlan::for_account(&self.account);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.recv() => return PollExit::Cancelled(connection),
                _ = ticker.tick() => {}
            }
            self.last_pass = Some(Instant::now());

            let permit = tokio::select! {
                biased;
                _ = self.shutdown.recv() => return PollExit::Cancelled(connection),
                permit = self.limiter.acquire() => permit,
            };
            let permit = match permit {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Pass limiter unavailable: {}", e);
                    return PollExit::Cancelled(connection);
                }
            };

            let result = run_pass(
                &mut connection,
                self.classifier.as_ref(),
                &plan,
                &self.shutdown,
            )
            .await;
            drop(permit);

            match result {
                Ok(_) if connection.is_tainted() => {
                    warn!("Connection tainted by an abandoned fetch, reconnecting");
                    return PollExit::Reconnect;
                }
                Ok(_) => {}
                Err(e) if e.requires_reconnect() || connection.is_tainted() => {
                    warn!("Pass aborted, reconnecting: {}", e);
                    return PollExit::Reconnect;
                }
                Err(e) => {
                    error!("Pass failed: {} (code {:?})", e, e.code());
                    tokio::select! {
                        biased;
                        _ = self.shutdown.recv() => return PollExit::Cancelled(connection),
                        _ = tokio::time::sleep(PASS_ERROR_DELAY) => {}
                    }
                }
            }
        }
    }

    async fn logout(connection: Connection<C::Session>) {
        let result = run_with_timeout!(
            LOGOUT_TIMEOUT,
            connection.logout(),
            raise_error!("LOGOUT timed out".into(), ErrorCode::ConnectionTimeout)
        );
        match result {
            Ok(Ok(())) => debug!("Logged out"),
            Ok(Err(e)) | Err(e) => debug!("Logout failed: {}", e),
        }
    }
}
