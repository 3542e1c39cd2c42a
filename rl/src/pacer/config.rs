//! Pacer configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for an [`AdaptivePacer`](super::AdaptivePacer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacerConfig {
    /// Initial and minimum delay in milliseconds
    #[serde(rename = "base-ms", default = "default_base_ms")]
    pub base_ms: u64,

    /// Ceiling delay in milliseconds
    #[serde(rename = "max-ms", default = "default_max_ms")]
    pub max_ms: u64,

    /// Multiplier applied on every overload signal
    #[serde(rename = "growth-factor", default = "default_growth_factor")]
    pub growth_factor: f64,

    /// Multiplier applied on a success after the quiet period
    #[serde(rename = "decay-factor", default = "default_decay_factor")]
    pub decay_factor: f64,

    /// Time without overload before decay is permitted, in milliseconds
    #[serde(rename = "quiet-period-ms", default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
}

fn default_base_ms() -> u64 {
    300
}

fn default_max_ms() -> u64 {
    10_000
}

fn default_growth_factor() -> f64 {
    2.0
}

fn default_decay_factor() -> f64 {
    0.8
}

fn default_quiet_period_ms() -> u64 {
    5_000
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            base_ms: default_base_ms(),
            max_ms: default_max_ms(),
            growth_factor: default_growth_factor(),
            decay_factor: default_decay_factor(),
            quiet_period_ms: default_quiet_period_ms(),
        }
    }
}

impl PacerConfig {
    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Check the numeric invariants the pacer relies on
    pub fn validate(&self) -> eyre::Result<()> {
        if self.base_ms == 0 {
            return Err(eyre::eyre!("base-ms must be greater than zero"));
        }
        if self.base_ms > self.max_ms {
            return Err(eyre::eyre!(
                "base-ms ({}) must not exceed max-ms ({})",
                self.base_ms,
                self.max_ms
            ));
        }
        if !(self.growth_factor >= 1.0 && self.growth_factor.is_finite()) {
            return Err(eyre::eyre!("growth-factor must be >= 1.0, got {}", self.growth_factor));
        }
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(eyre::eyre!("decay-factor must be in (0, 1], got {}", self.decay_factor));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PacerConfig::default();
        assert_eq!(config.base(), Duration::from_millis(300));
        assert_eq!(config.max(), Duration::from_secs(10));
        assert_eq!(config.growth_factor, 2.0);
        assert_eq!(config.decay_factor, 0.8);
        assert_eq!(config.quiet_period(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let inverted = PacerConfig {
            base_ms: 2_000,
            max_ms: 1_000,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let zero = PacerConfig {
            base_ms: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let shrinking = PacerConfig {
            growth_factor: 0.5,
            ..Default::default()
        };
        assert!(shrinking.validate().is_err());

        let growing_decay = PacerConfig {
            decay_factor: 1.5,
            ..Default::default()
        };
        assert!(growing_decay.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: PacerConfig = serde_yaml::from_str("base-ms: 100\n").unwrap();
        assert_eq!(config.base_ms, 100);
        assert_eq!(config.max_ms, 10_000);
        assert_eq!(config.quiet_period_ms, 5_000);
    }
}
