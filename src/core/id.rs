//! Opaque puzzle identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Unique, immutable identity of one puzzle instance.
///
/// Identifiers are random (UUID v4) and assigned by the registry when a
/// puzzle is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PuzzleId(Uuid);

impl PuzzleId {
    /// Generate a fresh random identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PuzzleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

/// Error returned when a string is not a valid puzzle identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid puzzle id '{input}'")]
pub struct ParseIdError {
    /// The rejected input
    pub input: String,
}

impl FromStr for PuzzleId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|_| ParseIdError {
            input: s.to_string(),
        })
    }
}
