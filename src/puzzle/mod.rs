//! Puzzle instances and their transition logic.
//!
//! A [`Puzzle`] owns its state table and current state. Transitions are
//! asynchronous because guards are evaluated by an external oracle; a
//! cancelled transition leaves the puzzle exactly as it was.

mod machine;
mod transition;

pub use machine::Puzzle;
pub use transition::{ActionOutcome, CancelReason, TransitionError};
