use crate::modules::error::SpamWardenResult;
use crate::modules::imap::capabilities::WITHIN;
use crate::modules::imap::connection::Connection;
use crate::modules::imap::executor::{compress_uid_list, MailboxSession};
use crate::modules::settings::config::Account;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::debug;

/// How far back recency mode looks.
pub const RECENT_WINDOW_SECS: i64 = 24 * 60 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Messages without `\Seen`, regardless of age.
    Unseen,
    /// Messages that arrived in the last 24 hours, regardless of `\Seen`.
    Recent,
}

impl SearchMode {
    pub fn for_account(account: &Account) -> Self {
        if account.search_unseen_only {
            SearchMode::Unseen
        } else {
            SearchMode::Recent
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchPlan {
    pub query: String,
    /// Set when the query is coarser than the window and hits must be re-checked
    /// against their INTERNALDATE.
    pub cutoff: Option<DateTime<Utc>>,
}

pub fn plan_search(mode: SearchMode, now: DateTime<Utc>, supports_within: bool) -> SearchPlan {
    match mode {
        SearchMode::Unseen => SearchPlan {
            query: "UNSEEN".into(),
            cutoff: None,
        },
        SearchMode::Recent if supports_within => SearchPlan {
            query: format!("YOUNGER {}", RECENT_WINDOW_SECS),
            cutoff: None,
        },
        SearchMode::Recent => {
            let cutoff = now - ChronoDuration::seconds(RECENT_WINDOW_SECS);
            // SINCE compares dates in the server's zone; start a day early and trim below.
            let since = cutoff - ChronoDuration::days(1);
            SearchPlan {
                query: format!("SINCE {}", since.format("%d-%b-%Y")),
                cutoff: Some(cutoff),
            }
        }
    }
}

/// Re-selects `inbox` and returns the candidate UIDs for one pass in ascending order.
pub async fn scan<S: MailboxSession>(
    connection: &mut Connection<S>,
    inbox: &str,
    mode: SearchMode,
    now: DateTime<Utc>,
) -> SpamWardenResult<Vec<u32>> {
    connection.select(inbox).await?;

    let supports_within = match mode {
        SearchMode::Unseen => false,
        SearchMode::Recent => connection.has_capability(WITHIN).await?,
    };
    let plan = plan_search(mode, now, supports_within);
    debug!("Searching '{}' with {}", inbox, plan.query);

    let uids = connection.session().uid_search(&plan.query).await?;
    let Some(cutoff) = plan.cutoff else {
        return Ok(uids);
    };
    if uids.is_empty() {
        return Ok(uids);
    }

    let dates = connection
        .session()
        .uid_fetch_internal_dates(&compress_uid_list(&uids))
        .await?;
    let mut recent: Vec<u32> = dates
        .into_iter()
        .filter(|(_, date)| date.with_timezone(&Utc) >= cutoff)
        .map(|(uid, _)| uid)
        .collect();
    recent.sort_unstable();
    recent.dedup();
    debug!(
        "{} of {} SINCE hits are inside the window",
        recent.len(),
        uids.len()
    );
    Ok(recent)
}
