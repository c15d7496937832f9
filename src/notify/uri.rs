//! Resource identifiers for puzzles.

use crate::core::PuzzleId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Scheme prefix of every puzzle resource identifier.
pub const URI_PREFIX: &str = "puzzle://";

/// Canonical resource identifier subscribers register under.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceUri(String);

impl ResourceUri {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("'{0}' is not a puzzle resource identifier")]
    WrongScheme(String),

    #[error("'{0}' does not contain a valid puzzle id")]
    InvalidId(String),
}

/// Map a puzzle id to its resource identifier (pure, deterministic).
pub fn derive_uri(id: &PuzzleId) -> ResourceUri {
    ResourceUri(format!("{URI_PREFIX}{id}"))
}

/// Recover the puzzle id from a resource identifier.
///
/// `extract_id(derive_uri(id).as_str()) == Ok(id)` for every id.
pub fn extract_id(uri: &str) -> Result<PuzzleId, UriError> {
    let rest = uri
        .strip_prefix(URI_PREFIX)
        .ok_or_else(|| UriError::WrongScheme(uri.to_string()))?;
    rest.parse()
        .map_err(|_| UriError::InvalidId(uri.to_string()))
}

impl TryFrom<&str> for ResourceUri {
    type Error = UriError;

    /// Accepts only canonical identifiers.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let id = extract_id(value)?;
        Ok(derive_uri(&id))
    }
}
