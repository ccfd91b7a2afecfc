use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{
    modules::error::{code::ErrorCode, SpamWardenResult},
    raise_error,
};

/// Caps how many accounts run a poll pass at the same time (the `workers` setting).
/// Idle supervisors and open connections are not counted.
#[derive(Clone, Debug)]
pub struct PassLimiter {
    semaphore: Option<Arc<Semaphore>>,
}

impl PassLimiter {
    /// `0` means no limit.
    pub fn new(workers: usize) -> Self {
        Self {
            semaphore: (workers > 0).then(|| Arc::new(Semaphore::new(workers))),
        }
    }

    pub fn unbounded() -> Self {
        Self { semaphore: None }
    }

    pub async fn acquire(&self) -> SpamWardenResult<Option<OwnedSemaphorePermit>> {
        match &self.semaphore {
            Some(sem) => sem.clone().acquire_owned().await.map(Some).map_err(|e| {
                raise_error!(
                    format!("Failed to acquire semaphore: {e}"),
                    ErrorCode::InternalError
                )
            }),
            None => Ok(None),
        }
    }

    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}
