//! One admission queue per provider
//!
//! Each provider gets its own pacer, so a metrics API backing off never
//! slows the primary data API down.

use std::collections::HashMap;

use eyre::Result;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::Config;
use crate::queue::AdmissionQueue;
use crate::retry::RetryPolicy;

/// Lazily built, per-provider admission queues
pub struct ProviderLanes {
    config: Config,
    lanes: Mutex<HashMap<String, AdmissionQueue>>,
}

impl ProviderLanes {
    pub fn new(config: Config) -> Self {
        debug!(default_provider = %config.default_provider, "ProviderLanes::new: called");
        Self {
            config,
            lanes: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Queue for the named provider
    ///
    /// Unknown names resolve to the default provider and share its lane.
    pub async fn lane(&self, provider: &str) -> Result<AdmissionQueue> {
        debug!(%provider, "ProviderLanes::lane: called");
        let (resolved, settings) = self.config.resolve_provider(provider);

        let mut lanes = self.lanes.lock().await;
        if let Some(queue) = lanes.get(&resolved) {
            return Ok(queue.clone());
        }

        info!(lane = %resolved, base_ms = settings.pacer.base_ms, max_ms = settings.pacer.max_ms, "Opening lane");
        let queue = AdmissionQueue::spawn(resolved.clone(), settings.pacer, self.config.overload.clone())?;
        lanes.insert(resolved, queue.clone());
        Ok(queue)
    }

    /// Retry policy for the named provider
    pub fn retry_policy(&self, provider: &str) -> RetryPolicy {
        RetryPolicy::from(&self.config.provider(provider))
    }

    /// Names of lanes opened so far
    pub async fn open_lanes(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lanes.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FailureSignal;
    use crate::domain::Priority;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_lanes_are_cached_and_independent() {
        let lanes = ProviderLanes::new(Config::default());

        let primary = lanes.lane("primary").await.unwrap();
        let metrics = lanes.lane("metrics").await.unwrap();
        assert_eq!(primary.name(), "primary");
        assert_eq!(metrics.name(), "metrics");

        let _ = metrics
            .run(Priority::LOW, || async { Err::<(), _>(FailureSignal::status(429)) })
            .await;

        assert_eq!(
            lanes.lane("metrics").await.unwrap().state().await.unwrap().current_delay,
            Duration::from_secs(2)
        );
        assert_eq!(
            primary.state().await.unwrap().current_delay,
            Duration::from_millis(300)
        );
        assert_eq!(lanes.open_lanes().await, vec!["metrics".to_string(), "primary".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_provider_shares_default_lane() {
        let lanes = ProviderLanes::new(Config::default());
        let weather = lanes.lane("weather").await.unwrap();
        assert_eq!(weather.name(), "primary");
        assert_eq!(lanes.open_lanes().await, vec!["primary".to_string()]);
    }

    #[test]
    fn test_retry_policy_per_provider() {
        let lanes = ProviderLanes::new(Config::default());
        assert_eq!(lanes.retry_policy("primary").max_retries, 3);
        assert_eq!(lanes.retry_policy("metrics").max_retries, 1);
    }
}
