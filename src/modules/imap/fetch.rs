// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::code::ErrorCode;
use crate::modules::error::{SpamWardenError, SpamWardenResult};
use crate::modules::imap::connection::Connection;
use crate::modules::imap::executor::{FetchedMessage, MailboxSession};
use std::future::Future;
use std::pin::Pin;
use crate::raise_error;
use std::time::Duration;
use tracing::warn;

/// Upper bound for retrieving one message body.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

type PendingFetch<'a> =
    Pin<Box<dyn Future<Output = SpamWardenResult<Option<FetchedMessage>>> + Send + 'a>>;

#[derive(Debug)]
pub enum FetchOutcome {
    Delivered(FetchedMessage),
    /// The server completed the command without returning a body.
    Missing,
    Failed(SpamWardenError),
    /// Carries a `FetchTimeout` error; the connection is tainted.
    TimedOut(SpamWardenError),
}

/// A body retrieval that has been prepared but not yet driven. While the handle lives it
/// holds the connection, so no other command can be interleaved.
pub struct FetchHandle<'a> {
    uid: u32,
    pending: PendingFetch<'a>,
    tainted: &'a mut bool,
}

impl<'a> FetchHandle<'a> {
    pub fn start<S: MailboxSession + 'a>(connection: &'a mut Connection<S>, uid: u32) -> Self {
        let Connection {
            session, tainted, ..
        } = connection;
        Self {
            uid,
            pending: Box::pin(session.uid_fetch_message(uid)),
            tainted,
        }
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Drives the retrieval for at most `timeout`. On expiry the request is dropped and
    /// the connection tainted, since its response may still arrive on the wire.
    pub async fn wait(mut self, timeout: Duration) -> FetchOutcome {
        let result = tokio::time::timeout(timeout, &mut self.pending).await;
        match result {
            Ok(Ok(Some(message))) => FetchOutcome::Delivered(message),
            Ok(Ok(None)) => FetchOutcome::Missing,
            Ok(Err(e)) => FetchOutcome::Failed(e),
            Err(_) => {
                let FetchHandle { uid, pending, tainted } = self;
                drop(pending);
                *tainted = true;
                let error = raise_error!(
                    format!("UID FETCH {} exceeded {:?}", uid, timeout),
                    ErrorCode::FetchTimeout
                );
                warn!("{}, request abandoned", error);
                FetchOutcome::TimedOut(error)
            }
        }
    }

    /// Discards the retrieval before any of it was sent.
    pub fn cancel(self) {
        drop(self.pending);
    }
}

pub async fn fetch_candidate<S: MailboxSession>(
    connection: &mut Connection<S>,
    uid: u32,
    timeout: Duration,
) -> FetchOutcome {
    FetchHandle::start(connection, uid).wait(timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::error::code::ErrorCode;
    use crate::modules::imap::flags::MessageFlag;
    use crate::modules::imap::mock::MockMailbox;

    async fn selected(mailbox: &MockMailbox) -> Connection<MockMailbox> {
        let mut connection = Connection::new(mailbox.clone());
        connection.select("INBOX").await.unwrap();
        connection
    }

    #[tokio::test]
    async fn delivers_body_without_setting_seen() {
        let mailbox = MockMailbox::new();
        let uid = mailbox.add_message("INBOX", b"Subject: x\r\n\r\nhello".to_vec(), false);
        let mut connection = selected(&mailbox).await;

        match fetch_candidate(&mut connection, uid, FETCH_TIMEOUT).await {
            FetchOutcome::Delivered(message) => {
                assert_eq!(message.uid, uid);
                assert_eq!(message.raw, b"Subject: x\r\n\r\nhello");
                assert!(!message.flags.contains(&MessageFlag::Seen));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!mailbox.is_seen("INBOX", uid));
        assert!(mailbox
            .commands()
            .contains(&format!("UID FETCH {} (UID FLAGS BODY.PEEK[])", uid)));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_fetch_times_out_and_taints() {
        let mailbox = MockMailbox::new();
        let uid = mailbox.add_message("INBOX", b"stuck".to_vec(), false);
        mailbox.hang_fetch(uid);
        let mut connection = selected(&mailbox).await;

        let outcome = fetch_candidate(&mut connection, uid, FETCH_TIMEOUT).await;
        assert!(matches!(
            outcome,
            FetchOutcome::TimedOut(ref e) if e.code() == ErrorCode::FetchTimeout
        ));
        assert!(connection.is_tainted());
    }

    #[tokio::test]
    async fn bodiless_and_failing_fetches_are_reported() {
        let mailbox = MockMailbox::new();
        let empty = mailbox.add_message("INBOX", b"gone".to_vec(), false);
        let broken = mailbox.add_message("INBOX", b"broken".to_vec(), false);
        mailbox.drop_body(empty);
        mailbox.fail_fetch(broken);
        let mut connection = selected(&mailbox).await;

        assert!(matches!(
            fetch_candidate(&mut connection, empty, FETCH_TIMEOUT).await,
            FetchOutcome::Missing
        ));
        match fetch_candidate(&mut connection, broken, FETCH_TIMEOUT).await {
            FetchOutcome::Failed(e) => assert_eq!(e.code(), ErrorCode::ImapFetchFailed),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!connection.is_tainted());
    }

    #[tokio::test]
    async fn cancelled_handle_sends_nothing() {
        let mailbox = MockMailbox::new();
        let uid = mailbox.add_message("INBOX", b"later".to_vec(), false);
        let mut connection = selected(&mailbox).await;

        let handle = FetchHandle::start(&mut connection, uid);
        assert_eq!(handle.uid(), uid);
        handle.cancel();

        assert!(!connection.is_tainted());
        assert!(!mailbox.commands().iter().any(|c| c.starts_with("UID FETCH")));
    }
}
