//! Priority tiers for units and sets.
//!
//! Lower values run first. The named tiers are fixed points on the integer
//! line so raw integers can be interleaved with them:
//! - `high`   = -100
//! - `normal` = 0
//! - `low`    = 100

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};

/// Resolved execution priority. Ascending order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(i64);

impl Priority {
    /// Runs before `normal`.
    pub const HIGH: Priority = Priority(-100);
    /// The default tier.
    pub const NORMAL: Priority = Priority(0);
    /// Runs after `normal`.
    pub const LOW: Priority = Priority(100);

    /// All named tiers in execution order.
    pub const NAMED: &'static [(&'static str, Priority)] = &[
        ("high", Priority::HIGH),
        ("normal", Priority::NORMAL),
        ("low", Priority::LOW),
    ];

    /// Wrap a raw integer priority.
    pub const fn new(value: i64) -> Self {
        Priority(value)
    }

    /// The integer this priority sorts by.
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Name of the tier, if this priority sits exactly on one.
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(_, p)| *p == self)
            .map(|(name, _)| *name)
    }

    /// Resolve a named tier (case-insensitive) or a numeric string.
    pub fn parse(token: &str) -> Result<Priority> {
        let trimmed = token.trim();
        let lowered = trimmed.to_lowercase();

        if let Some((_, priority)) = Self::NAMED.iter().find(|(name, _)| *name == lowered) {
            return Ok(*priority);
        }

        trimmed
            .parse::<i64>()
            .map(Priority)
            .map_err(|_| Error::InvalidPriorityToken {
                token: token.to_string(),
            })
    }

    /// Resolve any priority token.
    pub fn resolve(token: &PriorityToken) -> Result<Priority> {
        match token {
            PriorityToken::Level(value) => Ok(Priority(*value)),
            PriorityToken::Name(name) => Self::parse(name),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

impl From<i64> for Priority {
    fn from(value: i64) -> Self {
        Priority(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Priority::parse(s)
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let token = PriorityToken::deserialize(deserializer)?;
        Priority::resolve(&token).map_err(serde::de::Error::custom)
    }
}

/// Unresolved priority as written in a declarative specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriorityToken {
    /// Raw integer priority.
    Level(i64),
    /// Named tier or numeric string.
    Name(String),
}

impl PriorityToken {
    /// Resolve this token to a priority.
    pub fn resolve(&self) -> Result<Priority> {
        Priority::resolve(self)
    }
}

impl Default for PriorityToken {
    fn default() -> Self {
        PriorityToken::Name("normal".to_string())
    }
}

impl From<&str> for PriorityToken {
    fn from(name: &str) -> Self {
        PriorityToken::Name(name.to_string())
    }
}

impl From<String> for PriorityToken {
    fn from(name: String) -> Self {
        PriorityToken::Name(name)
    }
}

impl From<i64> for PriorityToken {
    fn from(value: i64) -> Self {
        PriorityToken::Level(value)
    }
}

impl From<Priority> for PriorityToken {
    fn from(priority: Priority) -> Self {
        PriorityToken::Level(priority.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_tiers() {
        assert_eq!(Priority::parse("high").unwrap(), Priority::HIGH);
        assert_eq!(Priority::parse("normal").unwrap(), Priority::NORMAL);
        assert_eq!(Priority::parse("low").unwrap(), Priority::LOW);
        assert_eq!(Priority::parse("HIGH").unwrap(), Priority::HIGH);
        assert!(Priority::HIGH < Priority::NORMAL);
        assert!(Priority::NORMAL < Priority::LOW);
    }

    #[test]
    fn test_numeric_passthrough() {
        assert_eq!(Priority::parse("42").unwrap().value(), 42);
        assert_eq!(Priority::parse("-7").unwrap().value(), -7);
        assert_eq!(Priority::resolve(&PriorityToken::Level(512)).unwrap().value(), 512);

        // -50 sits between high and normal
        let between = Priority::parse("-50").unwrap();
        assert!(Priority::HIGH < between && between < Priority::NORMAL);
    }

    #[test]
    fn test_invalid_token() {
        let err = Priority::parse("urgent").unwrap_err();
        assert_eq!(
            err,
            Error::InvalidPriorityToken {
                token: "urgent".to_string()
            }
        );
        assert!("".parse::<Priority>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Priority::HIGH.to_string(), "high");
        assert_eq!(Priority::new(7).to_string(), "7");
        assert_eq!(Priority::default(), Priority::NORMAL);
    }

    #[test]
    fn test_deserialize_tokens() {
        let p: Priority = serde_json::from_str(r#""low""#).unwrap();
        assert_eq!(p, Priority::LOW);
        let p: Priority = serde_json::from_str("-3").unwrap();
        assert_eq!(p.value(), -3);
        assert!(serde_json::from_str::<Priority>(r#""sometime""#).is_err());

        let token: PriorityToken = serde_json::from_str(r#""high""#).unwrap();
        assert_eq!(token, PriorityToken::Name("high".to_string()));
        let token: PriorityToken = serde_json::from_str("10").unwrap();
        assert_eq!(token, PriorityToken::Level(10));
    }

    #[test]
    fn test_serialize_as_integer() {
        assert_eq!(serde_json::to_string(&Priority::HIGH).unwrap(), "-100");
    }
}
