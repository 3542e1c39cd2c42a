//! Simulated provider for exercising lanes without a real API

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::classify::ProviderError;

/// An outbound API that work can be submitted against
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name, used to pick a lane
    fn name(&self) -> &str;

    /// Perform one call
    async fn call(&self, request: u64) -> Result<String, ProviderError>;
}

/// Scripted fake provider
///
/// Every `overload_every`-th call is answered with a 429; every other call
/// succeeds after `latency` plus up to `jitter` of random extra time.
#[derive(Debug)]
pub struct SimulatedProvider {
    name: String,
    latency: Duration,
    jitter: Duration,
    overload_every: Option<u64>,
    calls: AtomicU64,
}

impl SimulatedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            overload_every: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration, jitter: Duration) -> Self {
        self.latency = latency;
        self.jitter = jitter;
        self
    }

    /// Answer every `n`-th call with a rate limit (0 disables)
    pub fn with_overload_every(mut self, n: u64) -> Self {
        self.overload_every = (n > 0).then_some(n);
        self
    }

    /// Number of calls received so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for SimulatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, request: u64) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let extra = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=self.jitter.as_millis() as u64))
        };
        debug!(provider = %self.name, request, call, ?extra, "SimulatedProvider::call: called");

        tokio::time::sleep(self.latency + extra).await;

        if self.overload_every.is_some_and(|n| call % n == 0) {
            debug!(provider = %self.name, request, "SimulatedProvider::call: answering 429");
            return Err(ProviderError::from_status(429, "simulated rate limit", Some("1")));
        }
        Ok(format!("{}#{}", self.name, request))
    }
}
