// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use async_imap::types::{Capabilities, Capability};
use std::collections::HashSet;

pub const MOVE: &str = "MOVE";
pub const WITHIN: &str = "WITHIN";

/// The capability list a server advertised for one session, normalised to upper case.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    names: HashSet<String>,
}

impl CapabilitySet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_uppercase())
    }

    pub fn is_imap4(&self) -> bool {
        self.has("IMAP4rev1") || self.has("IMAP4rev2")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<&Capabilities> for CapabilitySet {
    fn from(capabilities: &Capabilities) -> Self {
        CapabilitySet::new(capabilities.iter().map(capability_to_string))
    }
}

pub fn capability_to_string(capability: &Capability) -> String {
    match capability {
        Capability::Imap4rev1 => "IMAP4rev1".into(),
        Capability::Auth(v) => format!("AUTH={}", v),
        Capability::Atom(v) => v.to_string(),
    }
}
