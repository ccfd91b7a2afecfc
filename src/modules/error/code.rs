// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCode {
    // Configuration errors (10000–10999)
    InvalidParameter = 10000,
    MissingConfiguration = 10010,
    InvalidConfiguration = 10020,

    // Network connection errors (40000–40999)
    NetworkError = 40000,
    ConnectionTimeout = 40010,
    TlsHandshakeFailed = 40020,

    // Mail service errors (50000–50999)
    ImapCommandFailed = 50000,
    ImapAuthenticationFailed = 50010,
    ImapConnectionLost = 50030,
    MailboxSelectFailed = 50040,
    ImapSearchFailed = 50050,
    ImapFetchFailed = 50060,
    FetchTimeout = 50070,
    ImapMoveFailed = 50080,

    // Classifier errors (60000–60999)
    ClassifierFailed = 60000,
    ClassifierOutputInvalid = 60010,
    ClassifierTimeout = 60020,

    // Internal system errors (70000–70999)
    InternalError = 70000,
}

impl ErrorCode {
    /// Whether an error with this code means the IMAP session can no longer be trusted
    /// and the owning account has to dial again.
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError
                | ErrorCode::ConnectionTimeout
                | ErrorCode::TlsHandshakeFailed
                | ErrorCode::ImapConnectionLost
        )
    }
}
