//! In-memory IMAP server state for exercising the pipeline without a network.

use crate::modules::error::code::ErrorCode;
use crate::modules::error::SpamWardenResult;
use crate::modules::imap::capabilities::CapabilitySet;
use crate::modules::imap::connection::Connector;
use crate::modules::imap::executor::{FetchedMessage, MailboxInfo, MailboxSession};
use crate::modules::imap::flags::MessageFlag;
use crate::modules::settings::config::Account;
use crate::raise_error;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Debug)]
pub struct MockMessage {
    pub uid: u32,
    pub raw: Vec<u8>,
    pub flags: Vec<MessageFlag>,
    pub internal_date: DateTime<FixedOffset>,
}

#[derive(Debug, Default)]
struct Folder {
    next_uid: u32,
    messages: Vec<MockMessage>,
}

impl Folder {
    fn push(&mut self, mut message: MockMessage) -> u32 {
        self.next_uid += 1;
        message.uid = self.next_uid;
        self.messages.push(message);
        self.next_uid
    }
}

#[derive(Debug, Default)]
struct MockState {
    folders: BTreeMap<String, Folder>,
    selected: Option<String>,
    capabilities: Vec<String>,
    commands: Vec<String>,
    capability_queries: usize,
    hanging_uids: HashSet<u32>,
    failing_uids: HashSet<u32>,
    bodiless_uids: HashSet<u32>,
    search_failures: Vec<ErrorCode>,
    logged_out: bool,
}

#[derive(Clone, Debug, Default)]
pub struct MockMailbox {
    state: Arc<Mutex<MockState>>,
}

pub fn test_account(search_unseen_only: bool) -> Account {
    Account {
        name: "test".into(),
        host: "imap.test.invalid:993".into(),
        tls: true,
        username: "user@test.invalid".into(),
        password: "secret".into(),
        inbox: "INBOX".into(),
        spam_folder: "Junk".into(),
        search_unseen_only,
    }
}

fn parse_uid_set(uid_set: &str) -> HashSet<u32> {
    let mut uids = HashSet::new();
    for part in uid_set.split(',') {
        match part.split_once(':') {
            Some((start, end)) => {
                if let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) {
                    uids.extend(start.min(end)..=start.max(end));
                }
            }
            None => {
                if let Ok(uid) = part.parse() {
                    uids.insert(uid);
                }
            }
        }
    }
    uids
}

fn matches_query(message: &MockMessage, query: &str) -> bool {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].to_ascii_uppercase().as_str() {
            "ALL" => {}
            "UNSEEN" => {
                if message.flags.contains(&MessageFlag::Seen) {
                    return false;
                }
            }
            "YOUNGER" => {
                i += 1;
                let Some(secs) = tokens.get(i).and_then(|t| t.parse::<i64>().ok()) else {
                    return false;
                };
                let cutoff = Utc::now() - chrono::Duration::seconds(secs);
                if message.internal_date.with_timezone(&Utc) < cutoff {
                    return false;
                }
            }
            "SINCE" => {
                i += 1;
                let Some(date) = tokens
                    .get(i)
                    .and_then(|t| NaiveDate::parse_from_str(t, "%d-%b-%Y").ok())
                else {
                    return false;
                };
                if message.internal_date.date_naive() < date {
                    return false;
                }
            }
            _ => return false,
        }
        i += 1;
    }
    true
}

impl MockMailbox {
    pub fn new() -> Self {
        let mailbox = Self::default();
        mailbox.lock().folders.insert("INBOX".into(), Folder::default());
        mailbox
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn with_capabilities(self, capabilities: &[&str]) -> Self {
        self.lock().capabilities = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_folder(self, name: &str) -> Self {
        self.lock().folders.entry(name.into()).or_default();
        self
    }

    pub fn add_message(&self, folder: &str, raw: Vec<u8>, seen: bool) -> u32 {
        self.add_dated_message(folder, raw, seen, Utc::now())
    }

    pub fn add_dated_message(
        &self,
        folder: &str,
        raw: Vec<u8>,
        seen: bool,
        internal_date: DateTime<Utc>,
    ) -> u32 {
        let flags = if seen { vec![MessageFlag::Seen] } else { vec![] };
        self.lock()
            .folders
            .entry(folder.into())
            .or_default()
            .push(MockMessage {
                uid: 0,
                raw,
                flags,
                internal_date: internal_date.into(),
            })
    }

    pub fn mark_deleted(&self, folder: &str, uid: u32) {
        let mut state = self.lock();
        if let Some(message) = state
            .folders
            .get_mut(folder)
            .and_then(|f| f.messages.iter_mut().find(|m| m.uid == uid))
        {
            message.flags.push(MessageFlag::Deleted);
        }
    }

    pub fn hang_fetch(&self, uid: u32) {
        self.lock().hanging_uids.insert(uid);
    }

    pub fn fail_fetch(&self, uid: u32) {
        self.lock().failing_uids.insert(uid);
    }

    pub fn drop_body(&self, uid: u32) {
        self.lock().bodiless_uids.insert(uid);
    }

    /// The next search fails with `code`; queued failures are consumed one per search.
    pub fn fail_next_search(&self, code: ErrorCode) {
        self.lock().search_failures.push(code);
    }

    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn capability_queries(&self) -> usize {
        self.lock().capability_queries
    }

    pub fn logged_out(&self) -> bool {
        self.lock().logged_out
    }

    pub fn uids(&self, folder: &str) -> Vec<u32> {
        self.lock()
            .folders
            .get(folder)
            .map(|f| f.messages.iter().map(|m| m.uid).collect())
            .unwrap_or_default()
    }

    pub fn bodies(&self, folder: &str) -> Vec<Vec<u8>> {
        self.lock()
            .folders
            .get(folder)
            .map(|f| f.messages.iter().map(|m| m.raw.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_seen(&self, folder: &str, uid: u32) -> bool {
        self.lock()
            .folders
            .get(folder)
            .and_then(|f| f.messages.iter().find(|m| m.uid == uid))
            .is_some_and(|m| m.flags.contains(&MessageFlag::Seen))
    }

    fn record(&self, command: String) -> MutexGuard<'_, MockState> {
        let mut state = self.lock();
        state.commands.push(command);
        state
    }

    fn selected_folder<'a>(state: &'a mut MockState) -> SpamWardenResult<&'a mut Folder> {
        let name = state.selected.clone().ok_or_else(|| {
            raise_error!("BAD No mailbox selected".into(), ErrorCode::ImapCommandFailed)
        })?;
        state.folders.get_mut(&name).ok_or_else(|| {
            raise_error!("NO Mailbox vanished".into(), ErrorCode::ImapCommandFailed)
        })
    }

    fn transfer(&self, uid_set: &str, destination: &str, remove: bool) -> SpamWardenResult<()> {
        let mut state = self.lock();
        if !state.folders.contains_key(destination) {
            return Err(raise_error!(
                format!("NO [TRYCREATE] Mailbox doesn't exist: {}", destination),
                ErrorCode::ImapMoveFailed
            ));
        }
        let wanted = parse_uid_set(uid_set);
        let source = Self::selected_folder(&mut state)?;
        let picked: Vec<MockMessage> = source
            .messages
            .iter()
            .filter(|m| wanted.contains(&m.uid))
            .cloned()
            .collect();
        if remove {
            source.messages.retain(|m| !wanted.contains(&m.uid));
        }
        if let Some(target) = state.folders.get_mut(destination) {
            for message in picked {
                target.push(message);
            }
        }
        Ok(())
    }
}

impl MailboxSession for MockMailbox {
    async fn select(&mut self, mailbox: &str) -> SpamWardenResult<MailboxInfo> {
        let mut state = self.record(format!("SELECT {}", mailbox));
        let Some(folder) = state.folders.get(mailbox) else {
            return Err(raise_error!(
                format!("NO Mailbox doesn't exist: {}", mailbox),
                ErrorCode::MailboxSelectFailed
            ));
        };
        let info = MailboxInfo {
            name: mailbox.to_string(),
            exists: folder.messages.len() as u32,
            unseen: None,
            uid_validity: Some(1),
        };
        state.selected = Some(mailbox.to_string());
        Ok(info)
    }

    async fn capabilities(&mut self) -> SpamWardenResult<CapabilitySet> {
        let mut state = self.record("CAPABILITY".into());
        state.capability_queries += 1;
        Ok(CapabilitySet::new(state.capabilities.iter()))
    }

    async fn uid_search(&mut self, query: &str) -> SpamWardenResult<Vec<u32>> {
        let mut state = self.record(format!("UID SEARCH {}", query));
        if !state.search_failures.is_empty() {
            let code = state.search_failures.remove(0);
            return Err(raise_error!("search failed".into(), code));
        }
        let folder = Self::selected_folder(&mut state)?;
        let mut uids: Vec<u32> = folder
            .messages
            .iter()
            .filter(|m| matches_query(m, query))
            .map(|m| m.uid)
            .collect();
        uids.sort_unstable();
        Ok(uids)
    }

    async fn uid_fetch_internal_dates(
        &mut self,
        uid_set: &str,
    ) -> SpamWardenResult<Vec<(u32, DateTime<FixedOffset>)>> {
        let mut state = self.record(format!("UID FETCH {} (UID INTERNALDATE)", uid_set));
        let wanted = parse_uid_set(uid_set);
        let folder = Self::selected_folder(&mut state)?;
        Ok(folder
            .messages
            .iter()
            .filter(|m| wanted.contains(&m.uid))
            .map(|m| (m.uid, m.internal_date))
            .collect())
    }

    async fn uid_fetch_message(&mut self, uid: u32) -> SpamWardenResult<Option<FetchedMessage>> {
        let hang = {
            let mut state = self.record(format!("UID FETCH {} (UID FLAGS BODY.PEEK[])", uid));
            state.hanging_uids.contains(&uid)
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.lock();
        if state.failing_uids.contains(&uid) {
            return Err(raise_error!(
                format!("NO UID FETCH {} failed", uid),
                ErrorCode::ImapFetchFailed
            ));
        }
        let bodiless = state.bodiless_uids.contains(&uid);
        let folder = Self::selected_folder(&mut state)?;
        let Some(message) = folder.messages.iter().find(|m| m.uid == uid) else {
            return Ok(None);
        };
        if bodiless {
            return Ok(None);
        }
        Ok(Some(FetchedMessage {
            uid,
            raw: message.raw.clone(),
            flags: message.flags.clone(),
        }))
    }

    async fn uid_copy(&mut self, uid_set: &str, mailbox: &str) -> SpamWardenResult<()> {
        drop(self.record(format!("UID COPY {} {}", uid_set, mailbox)));
        self.transfer(uid_set, mailbox, false)
    }

    async fn uid_move(&mut self, uid_set: &str, mailbox: &str) -> SpamWardenResult<()> {
        drop(self.record(format!("UID MOVE {} {}", uid_set, mailbox)));
        self.transfer(uid_set, mailbox, true)
    }

    async fn uid_mark_deleted(&mut self, uid_set: &str) -> SpamWardenResult<()> {
        let mut state = self.record(format!("UID STORE {} +FLAGS (\\Deleted)", uid_set));
        let wanted = parse_uid_set(uid_set);
        let folder = Self::selected_folder(&mut state)?;
        for message in folder.messages.iter_mut() {
            if wanted.contains(&message.uid) && !message.flags.contains(&MessageFlag::Deleted) {
                message.flags.push(MessageFlag::Deleted);
            }
        }
        Ok(())
    }

    async fn expunge(&mut self) -> SpamWardenResult<Vec<u32>> {
        let mut state = self.record("EXPUNGE".into());
        let folder = Self::selected_folder(&mut state)?;
        let mut expunged = Vec::new();
        let mut seq = 1u32;
        folder.messages.retain(|m| {
            if m.flags.contains(&MessageFlag::Deleted) {
                expunged.push(seq);
                false
            } else {
                seq += 1;
                true
            }
        });
        Ok(expunged)
    }

    async fn logout(&mut self) -> SpamWardenResult<()> {
        let mut state = self.record("LOGOUT".into());
        state.logged_out = true;
        state.selected = None;
        Ok(())
    }
}

/// Hands out clones of one [`MockMailbox`], so every reconnect sees the same server.
#[derive(Debug, Default)]
pub struct MockConnector {
    mailbox: MockMailbox,
    failing_dials: AtomicU32,
    hanging_dials: bool,
    reject_login: bool,
    drop_login: bool,
    dial_attempts: AtomicU32,
    login_attempts: AtomicU32,
}

impl MockConnector {
    pub fn new(mailbox: MockMailbox) -> Self {
        Self {
            mailbox,
            ..Default::default()
        }
    }

    pub fn failing_dials(self, count: u32) -> Self {
        self.failing_dials.store(count, Ordering::SeqCst);
        self
    }

    pub fn hanging_dials(mut self) -> Self {
        self.hanging_dials = true;
        self
    }

    /// The server accepts the connection but hangs up on LOGIN.
    pub fn dropping_login(mut self) -> Self {
        self.drop_login = true;
        self
    }

    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    pub fn dial_attempts(&self) -> u32 {
        self.dial_attempts.load(Ordering::SeqCst)
    }

    pub fn login_attempts(&self) -> u32 {
        self.login_attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    type Client = ();
    type Session = MockMailbox;

    async fn dial(&self, host: &str, port: u16) -> SpamWardenResult<()> {
        self.dial_attempts.fetch_add(1, Ordering::SeqCst);
        if self.hanging_dials {
            std::future::pending::<()>().await;
        }
        let failing = self
            .failing_dials
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(raise_error!(
                format!("connection refused: {}:{}", host, port),
                ErrorCode::NetworkError
            ));
        }
        Ok(())
    }

    async fn login(
        &self,
        _client: (),
        username: &str,
        _password: &str,
    ) -> SpamWardenResult<MockMailbox> {
        self.login_attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_login {
            return Err(raise_error!(
                format!("NO [AUTHENTICATIONFAILED] invalid credentials for {}", username),
                ErrorCode::ImapAuthenticationFailed
            ));
        }
        if self.drop_login {
            return Err(raise_error!(
                "* BYE server shutting down".into(),
                ErrorCode::ImapConnectionLost
            ));
        }
        self.mailbox.lock().logged_out = false;
        Ok(self.mailbox.clone())
    }
}
