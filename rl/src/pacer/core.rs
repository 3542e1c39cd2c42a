//! Adaptive pacer implementation

use std::time::Duration;

use eyre::{Context, Result};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::PacerConfig;

/// Internal state protected by mutex
#[derive(Debug)]
struct PacerState {
    current: Duration,
    last_overload_at: Option<Instant>,
}

/// Point-in-time copy of the pacer state for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacerSnapshot {
    pub base: Duration,
    pub max: Duration,
    pub current: Duration,
    pub last_overload_at: Option<Instant>,
}

/// Multiply a duration by a factor, rounded to the nearest nanosecond
fn scale(delay: Duration, factor: f64) -> Duration {
    let nanos = (delay.as_nanos() as f64 * factor).round();
    Duration::from_nanos(nanos.min(u64::MAX as f64) as u64)
}

/// The AdaptivePacer holds the inter-request delay. The delay doubles on
/// overload and relaxes only after a quiet period, always staying within
/// `[base, max]`.
#[derive(Debug)]
pub struct AdaptivePacer {
    config: PacerConfig,
    state: Mutex<PacerState>,
}

impl AdaptivePacer {
    /// Create a new pacer with `current = base`
    ///
    /// Rejects configs that could push the delay outside `[base, max]`.
    pub fn new(config: PacerConfig) -> Result<Self> {
        debug!(?config, "AdaptivePacer::new: called");
        config.validate().context("Invalid pacer configuration")?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: PacerConfig) -> Self {
        Self {
            state: Mutex::new(PacerState {
                current: config.base(),
                last_overload_at: None,
            }),
            config,
        }
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    /// Current inter-request delay
    pub async fn current_delay(&self) -> Duration {
        self.state.lock().await.current
    }

    /// Sleep for the current delay
    ///
    /// The delay is read under the lock and the lock is released before
    /// sleeping, so concurrent callers each wait independently.
    pub async fn pause_before_next(&self) {
        let delay = self.current_delay().await;
        debug!(?delay, "AdaptivePacer::pause_before_next: sleeping");
        tokio::time::sleep(delay).await;
    }

    /// Grow the delay after the provider signalled overload
    pub async fn on_overload_signal(&self) {
        let mut state = self.state.lock().await;
        let previous = state.current;
        state.current = scale(previous, self.config.growth_factor)
            .min(self.config.max())
            .max(self.config.base());
        state.last_overload_at = Some(Instant::now());
        warn!(?previous, current = ?state.current, "Overload signalled, growing delay");
    }

    /// Relax the delay if the quiet period has elapsed since the last overload
    pub async fn on_success_signal(&self) {
        let mut state = self.state.lock().await;
        let Some(last_overload_at) = state.last_overload_at else {
            debug!("AdaptivePacer::on_success_signal: no overload recorded, nothing to decay");
            return;
        };

        if last_overload_at.elapsed() > self.config.quiet_period() {
            let previous = state.current;
            state.current = scale(previous, self.config.decay_factor).max(self.config.base());
            debug!(?previous, current = ?state.current, "AdaptivePacer::on_success_signal: decayed");
        } else {
            debug!("AdaptivePacer::on_success_signal: within quiet period, holding delay");
        }
    }

    /// Return to the base delay and forget any overload
    pub async fn reset(&self) {
        debug!("AdaptivePacer::reset: called");
        let mut state = self.state.lock().await;
        state.current = self.config.base();
        state.last_overload_at = None;
    }

    pub async fn snapshot(&self) -> PacerSnapshot {
        let state = self.state.lock().await;
        PacerSnapshot {
            base: self.config.base(),
            max: self.config.max(),
            current: state.current,
            last_overload_at: state.last_overload_at,
        }
    }
}

impl Default for AdaptivePacer {
    fn default() -> Self {
        Self::from_valid(PacerConfig::default())
    }
}
