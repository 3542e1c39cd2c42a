//! Priority levels for admitted work

use serde::{Deserialize, Serialize};

/// Dispatch priority for a submitted operation
///
/// Smaller values are more urgent. Any integer is accepted; the named
/// constants are the vocabulary producers are expected to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const CRITICAL: Priority = Priority(1);
    pub const HIGH: Priority = Priority(3);
    pub const NORMAL: Priority = Priority(5);
    pub const LOW: Priority = Priority(7);

    /// Raw numeric value
    pub fn value(self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::CRITICAL => write!(f, "critical"),
            Self::HIGH => write!(f, "high"),
            Self::NORMAL => write!(f, "normal"),
            Self::LOW => write!(f, "low"),
            Self(other) => write!(f, "{}", other),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Self::CRITICAL),
            "high" => Ok(Self::HIGH),
            "normal" => Ok(Self::NORMAL),
            "low" => Ok(Self::LOW),
            other => other
                .parse::<i32>()
                .map(Self)
                .map_err(|_| format!("Unknown priority: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::CRITICAL < Priority::HIGH);
        assert!(Priority::HIGH < Priority::NORMAL);
        assert!(Priority::NORMAL < Priority::LOW);
    }

    #[test]
    fn test_priority_values() {
        assert_eq!(Priority::CRITICAL.value(), 1);
        assert_eq!(Priority::HIGH.value(), 3);
        assert_eq!(Priority::NORMAL.value(), 5);
        assert_eq!(Priority::LOW.value(), 7);
        assert_eq!(Priority::default(), Priority::NORMAL);
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(Priority::CRITICAL.to_string(), "critical");
        assert_eq!(Priority::LOW.to_string(), "low");
        assert_eq!(Priority(2).to_string(), "2");
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::HIGH);
        assert_eq!("CRITICAL".parse::<Priority>().unwrap(), Priority::CRITICAL);
        assert_eq!("4".parse::<Priority>().unwrap(), Priority(4));
        assert_eq!("-2".parse::<Priority>().unwrap(), Priority(-2));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_priority_serde() {
        let json = serde_json::to_string(&Priority::HIGH).unwrap();
        assert_eq!(json, "3");

        let priority: Priority = serde_json::from_str("7").unwrap();
        assert_eq!(priority, Priority::LOW);
    }
}
