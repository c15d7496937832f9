//! Puzzle registry.
//!
//! The registry is the sole owner of puzzle identity and lifecycle. It is an
//! explicitly constructed value: independent registries never share state.
//!
//! ## Locking
//!
//! - The id → puzzle map sits behind a synchronous `RwLock` that is never
//!   held across an `.await`, so readers never observe a half-applied
//!   mutation.
//! - Each puzzle sits behind its own async mutex. Holding it is what makes
//!   transitions on one id strictly sequential while different ids proceed
//!   independently.

use crate::config::GuardPolicy;
use crate::core::{GuardOracle, PuzzleId};
use crate::definition::PuzzleDefinition;
use crate::puzzle::{ActionOutcome, Puzzle, TransitionError};
use crate::snapshot::PuzzleSnapshot;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot = Arc<Mutex<Puzzle>>;

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Puzzle not found: {0}")]
    NotFound(PuzzleId),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Debug, Default)]
struct Entries {
    slots: HashMap<PuzzleId, Slot>,
    /// Insertion order for `list_ids`
    order: Vec<PuzzleId>,
}

/// Keyed store of puzzle instances.
#[derive(Debug, Default)]
pub struct PuzzleRegistry {
    entries: RwLock<Entries>,
    /// Applied to every puzzle this registry creates
    history_limit: Option<usize>,
}

/// Exclusive access to one registered puzzle.
///
/// While a `PuzzleLock` is alive no other transition on the same id can
/// start.
pub struct PuzzleLock {
    guard: OwnedMutexGuard<Puzzle>,
}

impl std::ops::Deref for PuzzleLock {
    type Target = Puzzle;

    fn deref(&self) -> &Puzzle {
        &self.guard
    }
}

impl std::ops::DerefMut for PuzzleLock {
    fn deref_mut(&mut self) -> &mut Puzzle {
        &mut self.guard
    }
}

impl PuzzleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose puzzles keep at most `limit` transitions of history.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            entries: RwLock::default(),
            history_limit: Some(limit),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, id: &PuzzleId) -> Result<Slot, RegistryError> {
        self.read()
            .slots
            .get(id)
            .cloned()
            .ok_or(RegistryError::NotFound(*id))
    }

    /// Whether `slot` is still the one registered under `id`.
    fn is_current(&self, id: &PuzzleId, slot: &Slot) -> bool {
        self.read()
            .slots
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Create a puzzle from a validated definition and store it.
    pub fn add_puzzle(&self, definition: PuzzleDefinition) -> PuzzleId {
        let mut entries = self.write();
        let mut id = PuzzleId::new_random();
        while entries.slots.contains_key(&id) {
            id = PuzzleId::new_random();
        }

        let puzzle = match self.history_limit {
            Some(limit) => Puzzle::new(id, definition).with_history_limit(limit),
            None => Puzzle::new(id, definition),
        };
        entries.slots.insert(id, Arc::new(Mutex::new(puzzle)));
        entries.order.push(id);

        tracing::info!(puzzle_id = %id, "puzzle added");
        id
    }

    /// Owned copy of the puzzle.
    ///
    /// Waits for any in-flight transition on the same id, so the copy is
    /// never taken mid-transition.
    pub async fn get_puzzle(&self, id: &PuzzleId) -> Result<Puzzle, RegistryError> {
        let slot = self.slot(id)?;
        let puzzle = slot.lock().await.clone();
        Ok(puzzle)
    }

    /// Replace the stored puzzle with the same id, if there is one.
    ///
    /// Returns `false` when the id is not registered; nothing is inserted.
    pub async fn update_puzzle(&self, puzzle: Puzzle) -> bool {
        let id = puzzle.id();
        let Ok(slot) = self.slot(&id) else {
            return false;
        };
        let mut current = slot.clone().lock_owned().await;
        if !self.is_current(&id, &slot) {
            return false;
        }
        *current = puzzle;
        tracing::debug!(puzzle_id = %id, "puzzle replaced");
        true
    }

    /// Acquire the transition lock of `id`.
    ///
    /// Fails with `NotFound` if the puzzle is removed while waiting.
    pub async fn lock(&self, id: &PuzzleId) -> Result<PuzzleLock, RegistryError> {
        let slot = self.slot(id)?;
        let guard = slot.clone().lock_owned().await;
        if !self.is_current(id, &slot) {
            return Err(RegistryError::NotFound(*id));
        }
        Ok(PuzzleLock { guard })
    }

    /// Run one transition under the puzzle's lock.
    pub async fn perform_action(
        &self,
        id: &PuzzleId,
        action: &str,
        oracle: &dyn GuardOracle,
        policy: &GuardPolicy,
    ) -> Result<ActionOutcome, RegistryError> {
        let mut puzzle = self.lock(id).await?;
        Ok(puzzle.perform_action(action, oracle, policy).await?)
    }

    pub async fn snapshot(&self, id: &PuzzleId) -> Result<PuzzleSnapshot, RegistryError> {
        let slot = self.slot(id)?;
        let snapshot = slot.lock().await.snapshot();
        Ok(snapshot)
    }

    pub fn contains(&self, id: &PuzzleId) -> bool {
        self.read().slots.contains_key(id)
    }

    pub fn count_puzzles(&self) -> usize {
        self.read().slots.len()
    }

    /// Registered ids in insertion order.
    pub fn list_ids(&self) -> Vec<PuzzleId> {
        self.read().order.clone()
    }

    /// Remove one puzzle. Returns whether it existed.
    pub fn remove_puzzle(&self, id: &PuzzleId) -> bool {
        let mut entries = self.write();
        let removed = entries.slots.remove(id).is_some();
        if removed {
            entries.order.retain(|existing| existing != id);
            tracing::info!(puzzle_id = %id, "puzzle removed");
        }
        removed
    }

    /// Remove every puzzle.
    pub fn clear_all(&self) {
        let mut entries = self.write();
        let count = entries.slots.len();
        entries.slots.clear();
        entries.order.clear();
        tracing::info!(count, "registry cleared");
    }
}
