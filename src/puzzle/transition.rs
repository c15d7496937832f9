//! Transition outcomes and errors.

use crate::core::{GuardPhase, TransitionRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a guard stopped a transition.
///
/// Cancellation is a normal outcome, not an error: the puzzle stays in the
/// state it was in before the attempt.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CancelReason {
    #[error("{phase} guard '{guard}' rejected the transition{}", detail(.reason))]
    Rejected {
        phase: GuardPhase,
        guard: String,
        reason: Option<String>,
    },

    #[error("{phase} guard '{guard}' timed out after {timeout_ms}ms")]
    TimedOut {
        phase: GuardPhase,
        guard: String,
        timeout_ms: u64,
    },

    #[error("{phase} guard '{guard}' could not be evaluated: {message}")]
    OracleFailed {
        phase: GuardPhase,
        guard: String,
        message: String,
    },
}

impl CancelReason {
    pub fn phase(&self) -> GuardPhase {
        match self {
            Self::Rejected { phase, .. }
            | Self::TimedOut { phase, .. }
            | Self::OracleFailed { phase, .. } => *phase,
        }
    }

    pub fn guard(&self) -> &str {
        match self {
            Self::Rejected { guard, .. }
            | Self::TimedOut { guard, .. }
            | Self::OracleFailed { guard, .. } => guard,
        }
    }
}

fn detail(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|reason| format!(": {reason}"))
        .unwrap_or_default()
}

/// Result of a well-formed action attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The transition committed
    Committed(TransitionRecord),

    /// A guard cancelled the transition; state unchanged
    Cancelled(CancelReason),
}

impl ActionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub fn cancel_reason(&self) -> Option<&CancelReason> {
        match self {
            Self::Committed(_) => None,
            Self::Cancelled(reason) => Some(reason),
        }
    }
}

/// Errors that can occur when attempting a transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Action '{action}' is not available from state '{state}'")]
    InvalidAction { action: String, state: String },

    #[error("Action '{action}' targets undefined state '{target}'")]
    UnknownTarget { action: String, target: String },
}
