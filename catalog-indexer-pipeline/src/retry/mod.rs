//! Retry policy for I/O against the catalog, the id set and the search engine.
//!
//! Transient errors are retried forever with capped exponential backoff.
//! Anything else is returned to the caller on the first occurrence.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use catalog_indexer_repository::{IdSetError, SearchError, SourceError};

/// Errors that know whether a retry can help.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for SourceError {
    fn is_transient(&self) -> bool {
        SourceError::is_transient(self)
    }
}

impl Transient for IdSetError {
    fn is_transient(&self) -> bool {
        IdSetError::is_transient(self)
    }
}

impl Transient for SearchError {
    fn is_transient(&self) -> bool {
        SearchError::is_transient(self)
    }
}

/// Capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Multiplier applied after each failed attempt.
    pub factor: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
            factor: 2,
        }
    }
}

impl Backoff {
    /// Create a backoff with the default factor of 2.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            factor: 2,
        }
    }

    /// The delay that follows `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(self.factor).min(self.max)
    }

    /// Run `op` until it succeeds or fails with a non-transient error.
    ///
    /// `operation` names the call in logs (e.g. `fetch_changes:person`).
    pub async fn retry<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut delay = self.initial.min(self.max);
        let mut attempt: u32 = 1;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation = %operation, attempt = attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        operation = %operation,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.next_delay(delay);
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => {
                    error!(
                        operation = %operation,
                        attempt = attempt,
                        error = %e,
                        "Operation failed with a non-transient error"
                    );
                    return Err(e);
                }
            }
        }
    }
}
