//! Strongly-typed ID wrappers
//!
//! `RecordId` is the surrogate key persisted next to every row. `MutationId`
//! tags the journal entries that belong to one guarded mutation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Surrogate key of a record, stable across loads and saves
///
/// Ids grow monotonically per table and are never reused, so a deleted
/// record's id cannot come back attached to a different row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Wrap a raw id value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw id value
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row-{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("row-").unwrap_or(s);
        Ok(Self(s.parse()?))
    }
}

/// Identifier shared by every journal entry of one guarded mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(Uuid);

impl MutationId {
    /// Create a new random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse an ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        s.parse()
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mut-{}", self.0)
    }
}

impl FromStr for MutationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("mut-").unwrap_or(s);
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_display_and_parse() {
        let id = RecordId::new(42);
        assert_eq!(id.to_string(), "row-42");
        assert_eq!("row-42".parse::<RecordId>().unwrap(), id);
        assert_eq!("42".parse::<RecordId>().unwrap(), id);
        assert!("row-x".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_mutation_id_round_trips_through_display() {
        let id = MutationId::new();
        let display = id.to_string();
        assert!(display.starts_with("mut-"));
        assert_eq!(MutationId::parse(&display).unwrap(), id);
    }

    #[test]
    fn test_mutation_id_serialization() {
        let id = MutationId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: MutationId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
