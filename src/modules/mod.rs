// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod account;
pub mod classifier;
pub mod common;
pub mod error;
pub mod imap;
pub mod logger;
pub mod settings;
pub mod utils;
