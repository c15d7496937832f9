//! Serializable views exposed to callers.
//!
//! These are the structured results handed back across the core's boundary.
//! They never include guard logic or locks, only plain data.

use crate::core::PuzzleId;
use crate::puzzle::{ActionOutcome, CancelReason};
use serde::{Deserialize, Serialize};

/// Point-in-time view of one puzzle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleSnapshot {
    pub puzzle_id: PuzzleId,
    pub current_state: String,
    /// Actions valid from `current_state`, in declaration order
    pub available_actions: Vec<String>,
}

/// Result of adding a puzzle from raw configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle_id: Option<PuzzleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AddResult {
    pub fn added(puzzle_id: PuzzleId) -> Self {
        Self {
            success: true,
            puzzle_id: Some(puzzle_id),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            puzzle_id: None,
            error: Some(error.to_string()),
        }
    }
}

/// Result of a well-formed action attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    /// State after the attempt; unchanged when cancelled
    pub current_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<CancelReason>,
}

impl ActionResult {
    /// Build from an outcome and the state the puzzle is in afterwards.
    pub fn from_outcome(outcome: ActionOutcome, current_state: impl Into<String>) -> Self {
        match outcome {
            ActionOutcome::Committed(_) => Self {
                success: true,
                current_state: current_state.into(),
                cancel_reason: None,
            },
            ActionOutcome::Cancelled(reason) => Self {
                success: false,
                current_state: current_state.into(),
                cancel_reason: Some(reason),
            },
        }
    }
}
