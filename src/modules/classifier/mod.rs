// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{code::ErrorCode, SpamWardenResult};
use crate::raise_error;
use std::future::Future;

pub mod spamc;

#[cfg(test)]
pub mod mock;

/// Outcome of classifying one message.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Verdict {
    pub is_spam: bool,
    pub score: f64,
    pub threshold: f64,
}

pub trait Classifier: Send + Sync {
    /// Classifies the untransformed message bytes.
    fn classify(&self, raw: &[u8]) -> impl Future<Output = SpamWardenResult<Verdict>> + Send;
}

/// A message is spam when the classifier said so, or when its score reached the
/// threshold. The score check applies even if the classifier said "not spam".
pub fn decide(signalled_spam: bool, score: f64, threshold: f64) -> Verdict {
    Verdict {
        is_spam: signalled_spam || score >= threshold,
        score,
        threshold,
    }
}

/// Reads `score/threshold` (e.g. `6.1/5.0`) from the start of the classifier report.
pub fn parse_report(output: &str) -> SpamWardenResult<(f64, f64)> {
    let invalid = || {
        raise_error!(
            format!("Unrecognised classifier output: {:?}", output.trim()),
            ErrorCode::ClassifierOutputInvalid
        )
    };

    let token = output.split_whitespace().next().ok_or_else(invalid)?;
    let (score, threshold) = token.split_once('/').ok_or_else(invalid)?;
    let score: f64 = score.parse().map_err(|_| invalid())?;
    let threshold: f64 = threshold.parse().map_err(|_| invalid())?;
    if !score.is_finite() || !threshold.is_finite() {
        return Err(invalid());
    }
    Ok((score, threshold))
}
