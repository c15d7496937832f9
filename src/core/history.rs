//! Transition history tracking.
//!
//! Every committed transition of a puzzle is recorded as an immutable
//! [`TransitionRecord`]. Cancelled or invalid attempts are never recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single committed transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    /// The state being left
    pub from: String,
    /// The state entered
    pub to: String,
    /// The action that triggered the transition
    pub action: String,
    /// When the transition committed
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Record a transition committing now.
    pub fn now(
        from: impl Into<String>,
        to: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            action: action.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered history of committed transitions.
///
/// [`TransitionHistory::record`] returns a new history with the transition
/// appended and leaves `self` untouched. A history created with
/// [`TransitionHistory::with_limit`] keeps only the most recent `limit`
/// transitions.
///
/// # Example
///
/// ```rust
/// use puzzlebox::core::{TransitionHistory, TransitionRecord};
///
/// let history = TransitionHistory::new()
///     .record(TransitionRecord::now("Closed", "Locked", "Lock"))
///     .record(TransitionRecord::now("Locked", "Closed", "Unlock"));
///
/// assert_eq!(history.path(), vec!["Closed", "Locked", "Closed"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionHistory {
    transitions: VecDeque<TransitionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
}

impl TransitionHistory {
    /// Create an empty, unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty history that retains at most `limit` transitions.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: VecDeque::with_capacity(limit.min(64)),
            limit: Some(limit.max(1)),
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Append a transition, returning a new history.
    pub fn record(&self, transition: TransitionRecord) -> Self {
        let mut next = self.clone();
        next.push(transition);
        next
    }

    /// Append in place, evicting the oldest transition when full.
    pub(crate) fn push(&mut self, transition: TransitionRecord) {
        if let Some(limit) = self.limit {
            while self.transitions.len() >= limit {
                self.transitions.pop_front();
            }
        }
        self.transitions.push_back(transition);
    }

    /// Forget every transition, keeping the limit.
    pub(crate) fn clear(&mut self) {
        self.transitions.clear();
    }

    /// States traversed: the first `from`, then each `to`.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.front() {
            path.push(first.from.as_str());
        }
        path.extend(self.transitions.iter().map(|t| t.to.as_str()));
        path
    }

    /// Time between the first and last transition, `None` when empty.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.front()?, self.transitions.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// Retained transitions, oldest first.
    pub fn transitions(&self) -> &VecDeque<TransitionRecord> {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
