use crate::modules::error::SpamWardenResult;
use crate::modules::imap::capabilities::MOVE;
use crate::modules::imap::connection::Connection;
use crate::modules::imap::executor::MailboxSession;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveStrategy {
    /// `UID MOVE`
    Native,
    /// `UID COPY` + `\Deleted` + `EXPUNGE`; `expunged` is what the purge removed, which
    /// can include messages flagged by someone else.
    CopyAndExpunge { expunged: Vec<u32> },
}

/// Relocates one message out of the selected mailbox. Any failed step leaves the message
/// where it was, although a fallback that fails after COPY may leave a duplicate behind
/// in `destination`.
pub async fn move_message<S: MailboxSession>(
    connection: &mut Connection<S>,
    uid: u32,
    destination: &str,
) -> SpamWardenResult<MoveStrategy> {
    let uid_set = uid.to_string();

    if connection.has_capability(MOVE).await? {
        connection.session().uid_move(&uid_set, destination).await?;
        return Ok(MoveStrategy::Native);
    }

    debug!("Server lacks MOVE, copying UID {} to '{}'", uid, destination);
    let session = connection.session();
    session.uid_copy(&uid_set, destination).await?;
    session.uid_mark_deleted(&uid_set).await?;
    let expunged = session.expunge().await?;
    Ok(MoveStrategy::CopyAndExpunge { expunged })
}
