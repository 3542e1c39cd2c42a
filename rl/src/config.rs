//! Ratelane configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::classify::OverloadPolicy;
use crate::pacer::PacerConfig;

/// Main Ratelane configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Provider used when a lookup names an unknown provider
    #[serde(rename = "default-provider")]
    pub default_provider: String,

    /// Which failures count as overload
    pub overload: OverloadPolicy,

    /// Per-provider tuning, keyed by provider name
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert("primary".to_string(), ProviderConfig::default());
        providers.insert(
            "metrics".to_string(),
            ProviderConfig {
                pacer: PacerConfig {
                    base_ms: 1_000,
                    max_ms: 30_000,
                    ..Default::default()
                },
                max_retries: 1,
                ..Default::default()
            },
        );

        Self {
            log_level: None,
            default_provider: "primary".to_string(),
            overload: OverloadPolicy::default(),
            providers,
        }
    }
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if !self.providers.contains_key(&self.default_provider) {
            warn!(
                default_provider = %self.default_provider,
                "Default provider has no settings, built-in defaults will be used"
            );
        }
        for (name, provider) in &self.providers {
            provider
                .pacer
                .validate()
                .context(format!("Invalid settings for provider '{}'", name))?;
        }
        Ok(())
    }

    /// Resolve a provider name to the name and settings actually used
    ///
    /// Unknown names fall back to the default provider; a missing default
    /// falls back to built-in settings.
    pub fn resolve_provider(&self, name: &str) -> (String, ProviderConfig) {
        debug!(%name, "resolve_provider: called");
        if let Some(provider) = self.providers.get(name) {
            return (name.to_string(), provider.clone());
        }

        warn!(
            provider = %name,
            fallback = %self.default_provider,
            "Unknown provider, using default provider settings"
        );
        let settings = self.providers.get(&self.default_provider).cloned().unwrap_or_default();
        (self.default_provider.clone(), settings)
    }

    /// Settings for the named provider, with default fallback
    pub fn provider(&self, name: &str) -> ProviderConfig {
        self.resolve_provider(name).1
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .ratelane.yml
        let local_config = PathBuf::from(".ratelane.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/ratelane/ratelane.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ratelane").join("ratelane.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Tuning for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Pacer settings
    #[serde(flatten)]
    pub pacer: PacerConfig,

    /// Retries for retryable failures when submitting with retry
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff in milliseconds
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            pacer: PacerConfig::default(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl ProviderConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
