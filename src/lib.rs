//! Puzzlebox: a registry of guarded finite-state-machine puzzles
//!
//! A puzzle is a named state machine built from a JSON definition. Actions
//! move it between states, and named guards on each state are evaluated by an
//! injected asynchronous oracle before a transition commits. Observers
//! subscribe to a puzzle's resource identifier and are told about every
//! committed transition.
//!
//! # Core Concepts
//!
//! - **Definition**: Validated JSON configuration via [`PuzzleDefinition`]
//! - **Puzzle**: One state machine instance with history via [`Puzzle`]
//! - **Registry**: Keyed store with per-id transition locking via [`PuzzleRegistry`]
//! - **Notification**: Subscriptions and fan-out via [`notify`]
//!
//! # Example
//!
//! ```rust
//! use puzzlebox::{Puzzle, PuzzleDefinition};
//! use puzzlebox::core::PuzzleId;
//!
//! let definition = PuzzleDefinition::from_json_str(r#"{
//!     "initialState": "Closed",
//!     "states": {
//!         "Closed": { "actions": {
//!             "Open": { "targetState": "Opened" },
//!             "Lock": { "targetState": "Locked" }
//!         } },
//!         "Opened": {},
//!         "Locked": { "actions": { "Unlock": { "targetState": "Closed" } } }
//!     }
//! }"#).unwrap();
//!
//! let puzzle = Puzzle::new(PuzzleId::new_random(), definition);
//! assert_eq!(puzzle.current_state().name, "Closed");
//! assert_eq!(puzzle.available_actions("Closed"), vec!["Open", "Lock"]);
//! ```

pub mod config;
pub mod core;
pub mod definition;
pub mod notify;
pub mod puzzle;
pub mod registry;
pub mod service;
pub mod snapshot;

// Re-export commonly used types
pub use config::{GuardPolicy, Settings};
pub use self::core::{GuardOracle, PuzzleId, StateDefinition};
pub use definition::{ConfigError, PuzzleDefinition};
pub use puzzle::{ActionOutcome, Puzzle};
pub use registry::{PuzzleRegistry, RegistryError};
pub use service::{PuzzleService, ServiceError};
