// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use async_imap::types::Flag;
use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum MessageFlag {
    Seen,
    Answered,
    Flagged,
    Deleted,
    Draft,
    Recent,
    MayCreate,
    Custom(String),
}

impl From<Flag<'_>> for MessageFlag {
    fn from(flag: Flag<'_>) -> Self {
        match flag {
            Flag::Seen => MessageFlag::Seen,
            Flag::Answered => MessageFlag::Answered,
            Flag::Flagged => MessageFlag::Flagged,
            Flag::Deleted => MessageFlag::Deleted,
            Flag::Draft => MessageFlag::Draft,
            Flag::Recent => MessageFlag::Recent,
            Flag::MayCreate => MessageFlag::MayCreate,
            Flag::Custom(name) => MessageFlag::Custom(name.into_owned()),
        }
    }
}

impl fmt::Display for MessageFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageFlag::Seen => f.write_str("\\Seen"),
            MessageFlag::Answered => f.write_str("\\Answered"),
            MessageFlag::Flagged => f.write_str("\\Flagged"),
            MessageFlag::Deleted => f.write_str("\\Deleted"),
            MessageFlag::Draft => f.write_str("\\Draft"),
            MessageFlag::Recent => f.write_str("\\Recent"),
            MessageFlag::MayCreate => f.write_str("\\*"),
            MessageFlag::Custom(name) => f.write_str(name),
        }
    }
}

/// Renders flags the way a FETCH response lists them, e.g. `(\Seen \Flagged)`.
pub fn flags_to_string(flags: &[MessageFlag]) -> String {
    let names: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
    format!("({})", names.join(" "))
}
