use crate::modules::error::SpamWardenError;
use std::time::Duration;

/// Wait between connection attempts.
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Decides whether a failed attempt is tried again. `attempt` counts from 1.
pub trait RetryPolicy: Send + Sync {
    fn next(&self, attempt: u32, error: &SpamWardenError) -> RetryDecision;
}

/// Same delay after every failure. Only errors that call for a new connection are retried.
#[derive(Clone, Copy, Debug)]
pub struct FixedBackoff {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl FixedBackoff {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::unbounded(CONNECT_RETRY_INTERVAL)
    }
}

impl RetryPolicy for FixedBackoff {
    fn next(&self, attempt: u32, error: &SpamWardenError) -> RetryDecision {
        if !error.code().requires_reconnect() {
            return RetryDecision::GiveUp;
        }
        match self.max_attempts {
            Some(max) if attempt >= max => RetryDecision::GiveUp,
            _ => RetryDecision::RetryAfter(self.interval),
        }
    }
}
