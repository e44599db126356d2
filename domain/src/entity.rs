//! Identifiers of the entities whose derived data is cached

use library::communication::implementation::fields::textual;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Numeric identifier of a post, comment or user
///
/// Deserializes from both numbers and their textual form as log entries carry everything as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(i64);

impl EntityId {
    /// Raw numeric value
    pub fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for EntityId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        textual::deserialize(deserializer).map(Self)
    }
}

/// Kind of entity that can be liked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Board post
    Post,
    /// Comment on a post
    Comment,
}

impl EntityKind {
    /// Lowercase name used in keys and URLs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn deserialize_numeric_and_textual_ids() {
        assert_eq!(serde_json::from_str::<EntityId>("42").unwrap(), EntityId(42));
        assert_eq!(serde_json::from_str::<EntityId>("\"42\"").unwrap(), EntityId(42));
        assert!(serde_json::from_str::<EntityId>("\"abc\"").is_err());
    }

    #[test]
    fn serialize_as_number() {
        assert_eq!(serde_json::to_string(&EntityId(7)).unwrap(), "7");
    }
}
