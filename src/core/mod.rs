//! Core puzzle types.
//!
//! This module contains the pure value types shared by every layer:
//! - Puzzle identity via [`PuzzleId`]
//! - State and action definitions
//! - The asynchronous guard oracle seam
//! - Immutable transition history
//!
//! Nothing in this module owns shared state or performs I/O.

mod guard;
mod history;
mod id;
mod state;

pub use guard::{
    AllowAll, FnGuardOracle, GuardContext, GuardDecision, GuardError, GuardOracle, GuardPhase,
    GuardRequest,
};
pub use history::{TransitionHistory, TransitionRecord};
pub use id::{ParseIdError, PuzzleId};
pub use state::{ActionDefinition, StateDefinition};
