// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::raise_error;
use code::ErrorCode;
use snafu::{Location, Snafu};

pub mod code;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SpamWardenError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
}

pub type SpamWardenResult<T, E = SpamWardenError> = std::result::Result<T, E>;

impl SpamWardenError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SpamWardenError::Generic { code, .. } => *code,
        }
    }

    pub fn requires_reconnect(&self) -> bool {
        self.code().requires_reconnect()
    }
}

/// Maps an async-imap failure onto our taxonomy. Transport-level failures always become
/// `ImapConnectionLost`; everything else keeps the code of the command that failed.
pub fn imap_error(error: async_imap::error::Error, code: ErrorCode) -> SpamWardenError {
    use async_imap::error::Error;
    match error {
        Error::Io(e) => raise_error!(format!("{:#?}", e), ErrorCode::ImapConnectionLost),
        Error::ConnectionLost => raise_error!(
            "IMAP connection lost".into(),
            ErrorCode::ImapConnectionLost
        ),
        other => raise_error!(format!("{:#?}", other), code),
    }
}
