// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::common::signal::Shutdown;
use crate::modules::error::{SpamWardenError, SpamWardenResult};
use crate::modules::imap::capabilities::CapabilitySet;
use crate::modules::imap::client::Client;
use crate::modules::imap::executor::{ImapMailbox, MailboxInfo, MailboxSession};
use crate::modules::imap::retry::{RetryDecision, RetryPolicy};
use crate::modules::settings::config::Account;
use std::future::Future;
use tracing::{debug, info, warn};

/// Opens sessions for an account. Dialing and authenticating are separate steps because
/// only the first one is retried.
pub trait Connector: Send + Sync {
    type Client: Send;
    type Session: MailboxSession;

    fn dial(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = SpamWardenResult<Self::Client>> + Send;

    fn login(
        &self,
        client: Self::Client,
        username: &str,
        password: &str,
    ) -> impl Future<Output = SpamWardenResult<Self::Session>> + Send;
}

/// Implicit-TLS IMAP.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImapConnector;

impl Connector for ImapConnector {
    type Client = Client;
    type Session = ImapMailbox;

    async fn dial(&self, host: &str, port: u16) -> SpamWardenResult<Client> {
        Client::connection(host, port).await
    }

    async fn login(
        &self,
        client: Client,
        username: &str,
        password: &str,
    ) -> SpamWardenResult<ImapMailbox> {
        let session = client.login(username, password).await?;
        Ok(ImapMailbox::new(session))
    }
}

/// An authenticated session and what is known about it. Dropped whole on reconnect,
/// which also discards the cached capabilities.
pub struct Connection<S> {
    pub(crate) session: S,
    mailbox: Option<MailboxInfo>,
    capabilities: Option<CapabilitySet>,
    pub(crate) tainted: bool,
}

impl<S: MailboxSession> Connection<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            mailbox: None,
            capabilities: None,
            tainted: false,
        }
    }

    pub fn session(&mut self) -> &mut S {
        &mut self.session
    }

    pub async fn select(&mut self, mailbox: &str) -> SpamWardenResult<&MailboxInfo> {
        let info = self.session.select(mailbox).await?;
        debug!(
            "Selected '{}': {} messages, uidvalidity {:?}",
            info.name, info.exists, info.uid_validity
        );
        Ok(&*self.mailbox.insert(info))
    }

    pub fn selected(&self) -> Option<&MailboxInfo> {
        self.mailbox.as_ref()
    }

    /// Queries CAPABILITY and replaces the cached set.
    pub async fn refresh_capabilities(&mut self) -> SpamWardenResult<&CapabilitySet> {
        let capabilities = self.session.capabilities().await?;
        debug!("Server advertises {} capabilities", capabilities.len());
        Ok(&*self.capabilities.insert(capabilities))
    }

    pub async fn has_capability(&mut self, name: &str) -> SpamWardenResult<bool> {
        if let Some(capabilities) = &self.capabilities {
            return Ok(capabilities.has(name));
        }
        Ok(self.refresh_capabilities().await?.has(name))
    }

    pub fn cached_capabilities(&self) -> Option<&CapabilitySet> {
        self.capabilities.as_ref()
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    pub async fn logout(mut self) -> SpamWardenResult<()> {
        self.session.logout().await
    }
}

#[derive(Debug)]
pub enum ConnectOutcome<T> {
    Connected(T),
    Cancelled,
    GaveUp(SpamWardenError),
}

/// Dials the account's server until it answers, the policy gives up, or shutdown is
/// requested. Shutdown interrupts both an in-flight dial and the wait between attempts.
pub async fn connect_with_retry<C, P>(
    connector: &C,
    account: &Account,
    policy: &P,
    shutdown: &mut Shutdown,
) -> ConnectOutcome<C::Client>
where
    C: Connector,
    P: RetryPolicy + ?Sized,
{
    let (host, port) = match account.endpoint() {
        Ok(endpoint) => endpoint,
        Err(e) => return ConnectOutcome::GaveUp(e),
    };

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = shutdown.recv() => return ConnectOutcome::Cancelled,
            result = connector.dial(&host, port) => result,
        };

        let error = match result {
            Ok(client) => {
                if attempt > 1 {
                    info!("Connected to {}:{} after {} attempts", host, port, attempt);
                } else {
                    info!("Connected to {}:{}", host, port);
                }
                return ConnectOutcome::Connected(client);
            }
            Err(e) => e,
        };

        match policy.next(attempt, &error) {
            RetryDecision::GiveUp => return ConnectOutcome::GaveUp(error),
            RetryDecision::RetryAfter(delay) => {
                warn!(
                    "Failed to connect to {}:{} (attempt {}): {}. Retrying in {:?}",
                    host, port, attempt, error, delay
                );
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => return ConnectOutcome::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
