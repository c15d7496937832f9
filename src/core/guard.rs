//! Guard oracle seam for controlling transitions.
//!
//! States name their guards but never interpret them. Before a transition
//! commits, the puzzle asks a [`GuardOracle`] whether the named guard allows
//! it. Production wires the oracle to a remote decision service; tests use
//! [`AllowAll`] or a deterministic [`FnGuardOracle`].

use crate::core::id::PuzzleId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which side of a transition a guard protects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuardPhase {
    /// Leaving the current state
    Exit,
    /// Entering the target state
    Enter,
}

impl fmt::Display for GuardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit => f.write_str("exit"),
            Self::Enter => f.write_str("enter"),
        }
    }
}

/// The transition being guarded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardContext {
    pub puzzle_id: PuzzleId,
    pub from_state: String,
    pub to_state: String,
    pub action: String,
}

/// One guard evaluation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardRequest {
    pub phase: GuardPhase,
    /// Opaque guard name taken from the state definition
    pub guard: String,
    pub context: GuardContext,
}

/// Decision returned by an oracle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum GuardDecision {
    Allow,
    Reject { reason: Option<String> },
}

impl GuardDecision {
    /// Reject with a human-readable reason.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: Some(reason.into()),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Failure to reach a decision at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Guard oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown guard '{0}'")]
    UnknownGuard(String),
}

/// Asynchronous yes/no decision for a named guard.
///
/// Implementations may suspend (remote calls); callers bound every
/// evaluation with a timeout and treat errors as rejection.
#[async_trait]
pub trait GuardOracle: Send + Sync {
    async fn evaluate(&self, request: &GuardRequest) -> Result<GuardDecision, GuardError>;
}

/// Oracle that allows every guard.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl GuardOracle for AllowAll {
    async fn evaluate(&self, _request: &GuardRequest) -> Result<GuardDecision, GuardError> {
        Ok(GuardDecision::Allow)
    }
}

/// Oracle backed by a pure decision function.
///
/// The function must be deterministic and thread-safe (Send + Sync).
///
/// # Example
///
/// ```rust
/// use puzzlebox::core::{FnGuardOracle, GuardPhase};
///
/// // Only the "has-key" guard passes, and only when entering.
/// let oracle = FnGuardOracle::from_predicate(|request| {
///     request.guard == "has-key" && request.phase == GuardPhase::Enter
/// });
/// # let _ = oracle;
/// ```
pub struct FnGuardOracle {
    decide: Box<dyn Fn(&GuardRequest) -> GuardDecision + Send + Sync>,
}

impl FnGuardOracle {
    /// Create an oracle from a decision function.
    pub fn new<F>(decide: F) -> Self
    where
        F: Fn(&GuardRequest) -> GuardDecision + Send + Sync + 'static,
    {
        Self {
            decide: Box::new(decide),
        }
    }

    /// Create an oracle from a boolean predicate; `false` rejects without a
    /// reason.
    pub fn from_predicate<F>(predicate: F) -> Self
    where
        F: Fn(&GuardRequest) -> bool + Send + Sync + 'static,
    {
        Self::new(move |request| {
            if predicate(request) {
                GuardDecision::Allow
            } else {
                GuardDecision::Reject { reason: None }
            }
        })
    }
}

#[async_trait]
impl GuardOracle for FnGuardOracle {
    async fn evaluate(&self, request: &GuardRequest) -> Result<GuardDecision, GuardError> {
        Ok((self.decide)(request))
    }
}
