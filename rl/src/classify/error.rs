//! Provider error types

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::policy::{Classify, FailureSignal};

/// Category tag carried by rate-limit failures
pub const RATE_LIMIT_CATEGORY: &str = "rate_limit";

/// Errors a provider wrapper maps its outbound-call failures onto
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{category}: {message}")]
    Categorized { category: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Check if an HTTP status code is worth retrying
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504 | 529)
}

impl ProviderError {
    /// Build an error from a non-success HTTP response
    ///
    /// `retry_after` is the raw `Retry-After` header value, in seconds.
    pub fn from_status(status: u16, body: impl Into<String>, retry_after: Option<&str>) -> Self {
        debug!(status, ?retry_after, "ProviderError::from_status: called");
        if status == 429 {
            let retry_after = retry_after
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Self::RateLimited { retry_after };
        }
        Self::Api {
            status,
            message: body.into(),
        }
    }

    /// HTTP-style status code, when one applies
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Named error category, when one applies
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::RateLimited { .. } => Some(RATE_LIMIT_CATEGORY),
            Self::Categorized { category, .. } => Some(category),
            Self::Network(_) => Some("network"),
            Self::Timeout(_) => Some("timeout"),
            Self::InvalidResponse(_) => Some("invalid_response"),
            Self::Api { .. } => None,
        }
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status == 429,
            Self::Categorized { category, .. } => category == RATE_LIMIT_CATEGORY,
            _ => false,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => is_retryable_status(*status),
            Self::Categorized { category, .. } => category == RATE_LIMIT_CATEGORY,
            Self::Network(_) => true,
            Self::Timeout(_) => true,
            Self::InvalidResponse(_) => false,
        }
    }

    /// Get the server-requested wait, if the provider sent one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl Classify for ProviderError {
    fn signal(&self) -> FailureSignal {
        FailureSignal {
            status: self.status(),
            category: self.category().map(str::to_string),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        debug!(error = %err, "ProviderError::from<reqwest::Error>: called");
        if err.is_timeout() {
            return Self::Timeout(err.to_string());
        }
        match err.status().map(|s| s.as_u16()) {
            Some(429) => Self::RateLimited { retry_after: None },
            Some(status) => Self::Api {
                status,
                message: err.to_string(),
            },
            None if err.is_decode() => Self::InvalidResponse(err.to_string()),
            None => Self::Network(err.to_string()),
        }
    }
}
