//! Failure classification

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the queue gets to see of a failed operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureSignal {
    /// HTTP-style status code
    pub status: Option<u16>,

    /// Named error category
    pub category: Option<String>,
}

impl FailureSignal {
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            category: None,
        }
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self {
            status: None,
            category: Some(category.into()),
        }
    }
}

/// Maps an operation's error onto a [`FailureSignal`]
///
/// Provider wrappers implement this for their error type so the queue stays
/// provider-agnostic.
pub trait Classify {
    fn signal(&self) -> FailureSignal;
}

impl Classify for FailureSignal {
    fn signal(&self) -> FailureSignal {
        self.clone()
    }
}

/// Decides which failures count as overload signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverloadPolicy {
    /// Status codes treated as overload
    pub statuses: Vec<u16>,

    /// Error categories treated as overload
    pub categories: Vec<String>,
}

impl Default for OverloadPolicy {
    fn default() -> Self {
        Self {
            statuses: vec![429],
            categories: vec![super::RATE_LIMIT_CATEGORY.to_string()],
        }
    }
}

impl OverloadPolicy {
    /// Policy that never reports overload
    pub fn never() -> Self {
        Self {
            statuses: Vec::new(),
            categories: Vec::new(),
        }
    }

    /// Check if the given failure should grow the pacer
    pub fn is_overload(&self, signal: &FailureSignal) -> bool {
        let by_status = signal.status.is_some_and(|s| self.statuses.contains(&s));
        let by_category = signal
            .category
            .as_ref()
            .is_some_and(|c| self.categories.iter().any(|known| known == c));
        debug!(?signal, by_status, by_category, "OverloadPolicy::is_overload: called");
        by_status || by_category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = OverloadPolicy::default();
        assert!(policy.is_overload(&FailureSignal::status(429)));
        assert!(policy.is_overload(&FailureSignal::category("rate_limit")));
        assert!(!policy.is_overload(&FailureSignal::status(500)));
        assert!(!policy.is_overload(&FailureSignal::category("network")));
        assert!(!policy.is_overload(&FailureSignal::default()));
    }

    #[test]
    fn test_custom_policy() {
        let policy = OverloadPolicy {
            statuses: vec![429, 529],
            categories: vec!["overloaded_error".to_string()],
        };
        assert!(policy.is_overload(&FailureSignal::status(529)));
        assert!(policy.is_overload(&FailureSignal::category("overloaded_error")));
        assert!(!policy.is_overload(&FailureSignal::category("rate_limit")));
    }

    #[test]
    fn test_never_policy() {
        let policy = OverloadPolicy::never();
        assert!(!policy.is_overload(&FailureSignal::status(429)));
    }

    #[test]
    fn test_deserialize_policy() {
        let yaml = "statuses: [429, 503]\n";
        let policy: OverloadPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy.statuses, vec![429, 503]);
        assert_eq!(policy.categories, vec!["rate_limit".to_string()]);
    }
}
