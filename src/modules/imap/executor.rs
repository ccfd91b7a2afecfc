// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::encode_mailbox_name;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::{imap_error, SpamWardenResult};
use crate::modules::imap::capabilities::CapabilitySet;
use crate::modules::imap::flags::MessageFlag;
use crate::modules::imap::session::SessionStream;
use async_imap::types::Fetch;
use async_imap::Session;
use chrono::{DateTime, FixedOffset};
use futures::TryStreamExt;
use std::future::Future;

/// Full message, read without touching `\Seen`.
pub const BODY_FETCH_COMMAND: &str = "(UID FLAGS BODY.PEEK[])";

const INTERNALDATE_QUERY: &str = "(UID INTERNALDATE)";

const DELETED_FLAG_STORE: &str = "+FLAGS (\\Deleted)";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MailboxInfo {
    pub name: String,
    pub exists: u32,
    pub unseen: Option<u32>,
    pub uid_validity: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedMessage {
    pub uid: u32,
    pub raw: Vec<u8>,
    pub flags: Vec<MessageFlag>,
}

impl FetchedMessage {
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    pub fn is_seen(&self) -> bool {
        self.flags.contains(&MessageFlag::Seen)
    }
}

/// Collapses UIDs into an IMAP sequence set, `[1, 2, 3, 7]` becomes `1:3,7`.
pub fn compress_uid_list(uids: &[u32]) -> String {
    if uids.is_empty() {
        return String::new();
    }
    let mut sorted = uids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut start = sorted[0];
    let mut prev = sorted[0];
    for &uid in &sorted[1..] {
        if uid == prev + 1 {
            prev = uid;
            continue;
        }
        ranges.push(render_range(start, prev));
        start = uid;
        prev = uid;
    }
    ranges.push(render_range(start, prev));
    ranges.join(",")
}

fn render_range(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}:{}", start, end)
    }
}

/// The IMAP commands an account supervisor issues against its selected mailbox.
///
/// Mailbox names are passed in their display form; implementations encode them for the
/// wire. Every command is a single round trip and leaves the session usable unless the
/// returned error says the connection was lost.
pub trait MailboxSession: Send {
    fn select(&mut self, mailbox: &str)
        -> impl Future<Output = SpamWardenResult<MailboxInfo>> + Send;

    fn capabilities(&mut self) -> impl Future<Output = SpamWardenResult<CapabilitySet>> + Send;

    /// `UID SEARCH`; the result is sorted ascending.
    fn uid_search(&mut self, query: &str)
        -> impl Future<Output = SpamWardenResult<Vec<u32>>> + Send;

    fn uid_fetch_internal_dates(
        &mut self,
        uid_set: &str,
    ) -> impl Future<Output = SpamWardenResult<Vec<(u32, DateTime<FixedOffset>)>>> + Send;

    /// `Ok(None)` when the server answered without a body for `uid`.
    fn uid_fetch_message(
        &mut self,
        uid: u32,
    ) -> impl Future<Output = SpamWardenResult<Option<FetchedMessage>>> + Send;

    fn uid_copy(
        &mut self,
        uid_set: &str,
        mailbox: &str,
    ) -> impl Future<Output = SpamWardenResult<()>> + Send;

    fn uid_move(
        &mut self,
        uid_set: &str,
        mailbox: &str,
    ) -> impl Future<Output = SpamWardenResult<()>> + Send;

    fn uid_mark_deleted(&mut self, uid_set: &str)
        -> impl Future<Output = SpamWardenResult<()>> + Send;

    /// Unscoped `EXPUNGE`; returns the sequence numbers the server reported as removed.
    fn expunge(&mut self) -> impl Future<Output = SpamWardenResult<Vec<u32>>> + Send;

    fn logout(&mut self) -> impl Future<Output = SpamWardenResult<()>> + Send;
}

/// [`MailboxSession`] over a logged-in async-imap session.
pub struct ImapMailbox {
    session: Session<Box<dyn SessionStream>>,
}

impl ImapMailbox {
    pub fn new(session: Session<Box<dyn SessionStream>>) -> Self {
        Self { session }
    }
}

fn message_from_fetch(uid: u32, fetch: &Fetch) -> Option<FetchedMessage> {
    let raw = fetch.body()?.to_vec();
    Some(FetchedMessage {
        uid: fetch.uid.unwrap_or(uid),
        raw,
        flags: fetch.flags().map(MessageFlag::from).collect(),
    })
}

impl MailboxSession for ImapMailbox {
    async fn select(&mut self, mailbox: &str) -> SpamWardenResult<MailboxInfo> {
        let selected = self
            .session
            .select(encode_mailbox_name!(mailbox))
            .await
            .map_err(|e| imap_error(e, ErrorCode::MailboxSelectFailed))?;
        Ok(MailboxInfo {
            name: mailbox.to_string(),
            exists: selected.exists,
            unseen: selected.unseen,
            uid_validity: selected.uid_validity,
        })
    }

    async fn capabilities(&mut self) -> SpamWardenResult<CapabilitySet> {
        let capabilities = self
            .session
            .capabilities()
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapCommandFailed))?;
        Ok(CapabilitySet::from(&capabilities))
    }

    async fn uid_search(&mut self, query: &str) -> SpamWardenResult<Vec<u32>> {
        let found = self
            .session
            .uid_search(query)
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapSearchFailed))?;
        let mut uids: Vec<u32> = found.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    async fn uid_fetch_internal_dates(
        &mut self,
        uid_set: &str,
    ) -> SpamWardenResult<Vec<(u32, DateTime<FixedOffset>)>> {
        let fetches = self
            .session
            .uid_fetch(uid_set, INTERNALDATE_QUERY)
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapSearchFailed))?
            .try_collect::<Vec<Fetch>>()
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapSearchFailed))?;
        Ok(fetches
            .iter()
            .filter_map(|f| Some((f.uid?, f.internal_date()?)))
            .collect())
    }

    async fn uid_fetch_message(&mut self, uid: u32) -> SpamWardenResult<Option<FetchedMessage>> {
        let fetches = self
            .session
            .uid_fetch(uid.to_string(), BODY_FETCH_COMMAND)
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapFetchFailed))?
            .try_collect::<Vec<Fetch>>()
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapFetchFailed))?;
        // Unsolicited FETCH responses for other messages can be interleaved.
        Ok(fetches
            .iter()
            .filter(|f| f.uid.is_none_or(|u| u == uid))
            .find_map(|f| message_from_fetch(uid, f)))
    }

    async fn uid_copy(&mut self, uid_set: &str, mailbox: &str) -> SpamWardenResult<()> {
        self.session
            .uid_copy(uid_set, encode_mailbox_name!(mailbox))
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapMoveFailed))
    }

    async fn uid_move(&mut self, uid_set: &str, mailbox: &str) -> SpamWardenResult<()> {
        self.session
            .uid_mv(uid_set, encode_mailbox_name!(mailbox))
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapMoveFailed))
    }

    async fn uid_mark_deleted(&mut self, uid_set: &str) -> SpamWardenResult<()> {
        self.session
            .uid_store(uid_set, DELETED_FLAG_STORE)
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapMoveFailed))?
            .try_collect::<Vec<Fetch>>()
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapMoveFailed))?;
        Ok(())
    }

    async fn expunge(&mut self) -> SpamWardenResult<Vec<u32>> {
        self.session
            .expunge()
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapMoveFailed))?
            .try_collect::<Vec<u32>>()
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapMoveFailed))
    }

    async fn logout(&mut self) -> SpamWardenResult<()> {
        self.session
            .logout()
            .await
            .map_err(|e| imap_error(e, ErrorCode::ImapCommandFailed))
    }
}
