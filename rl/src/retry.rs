//! Bounded retry through the admission queue
//!
//! Each attempt is a fresh submission, so a retry waits its turn in priority
//! order and is paced like any other call.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::classify::ProviderError;
use crate::config::ProviderConfig;
use crate::domain::Priority;
use crate::queue::{AdmissionQueue, QueueError};

/// How many times, and how patiently, to retry a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ProviderConfig::default())
    }
}

impl From<&ProviderConfig> for RetryPolicy {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Wait before the given retry (1-based), honouring a server-requested
    /// delay when it is longer
    pub fn delay_for(&self, retry: u32, err: &ProviderError) -> Duration {
        let exponential = self.backoff.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)));
        match err.retry_after() {
            Some(requested) => requested.max(exponential),
            None => exponential,
        }
    }

    /// Run an operation through the queue, re-submitting retryable failures
    ///
    /// `factory` builds a fresh attempt each time. The last failure is
    /// returned to the caller unchanged.
    pub async fn run<F, Fut, T>(
        &self,
        queue: &AdmissionQueue,
        priority: impl Into<Priority>,
        mut factory: F,
    ) -> Result<T, QueueError<ProviderError>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>> + Send + 'static,
        T: Send + 'static,
    {
        let priority = priority.into();
        debug!(lane = %queue.name(), %priority, policy = ?self, "RetryPolicy::run: called");

        let mut retry = 0;
        loop {
            let attempt = factory();
            match queue.run(priority, move || attempt).await {
                Err(QueueError::Operation(err)) if err.is_retryable() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay_for(retry, &err);
                    warn!(lane = %queue.name(), retry, ?delay, error = %err, "Retrying after failure");
                    tokio::time::sleep(delay).await;
                }
                other => {
                    debug!(lane = %queue.name(), retry, ok = other.is_ok(), "RetryPolicy::run: settled");
                    return other;
                }
            }
        }
    }
}
