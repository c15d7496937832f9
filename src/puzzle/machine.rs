//! Puzzle state machine with guarded transitions.

use crate::config::GuardPolicy;
use crate::core::{
    ActionDefinition, GuardContext, GuardDecision, GuardOracle, GuardPhase, GuardRequest,
    PuzzleId, StateDefinition, TransitionHistory, TransitionRecord,
};
use crate::definition::{finish, target_checks, ConfigError, ConfigIssue, PuzzleDefinition};
use crate::puzzle::transition::{ActionOutcome, CancelReason, TransitionError};
use crate::snapshot::PuzzleSnapshot;
use std::collections::BTreeMap;

/// One finite-state-machine instance.
///
/// The current state always resolves: states can be added or replaced after
/// construction but never removed.
#[derive(Clone, Debug)]
pub struct Puzzle {
    id: PuzzleId,
    initial_state: String,
    states: BTreeMap<String, StateDefinition>,
    current: StateDefinition,
    history: TransitionHistory,
}

impl Puzzle {
    /// Create a puzzle in the definition's initial state.
    pub fn new(id: PuzzleId, definition: PuzzleDefinition) -> Self {
        let (initial_state, states) = definition.into_parts();
        let current = states
            .get(&initial_state)
            .cloned()
            .unwrap_or_else(|| StateDefinition::new(initial_state.as_str()));

        Self {
            id,
            initial_state,
            states,
            current,
            history: TransitionHistory::new(),
        }
    }

    /// Retain at most `limit` transitions in this puzzle's history.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = TransitionHistory::with_limit(limit);
        self
    }

    pub fn id(&self) -> PuzzleId {
        self.id
    }

    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    /// Current state definition (pure).
    pub fn current_state(&self) -> &StateDefinition {
        &self.current
    }

    pub fn states(&self) -> &BTreeMap<String, StateDefinition> {
        &self.states
    }

    /// Committed transitions in commit order.
    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// Action names valid from `state`, in declaration order.
    ///
    /// Unknown and terminal states both yield an empty list.
    pub fn available_actions(&self, state: &str) -> Vec<String> {
        self.states
            .get(state)
            .map(|s| s.action_names().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Action names valid from the current state.
    pub fn current_actions(&self) -> Vec<String> {
        self.available_actions(&self.current.name)
    }

    pub fn snapshot(&self) -> PuzzleSnapshot {
        PuzzleSnapshot {
            puzzle_id: self.id,
            current_state: self.current.name.clone(),
            available_actions: self.current_actions(),
        }
    }

    /// Add or replace a state.
    ///
    /// Every action of the new state must target a state that exists after
    /// the insertion.
    pub fn add_state(&mut self, state: StateDefinition) -> Result<(), ConfigError> {
        if state.name.is_empty() {
            return Err(ConfigIssue::malformed("/states", "state name must not be empty").into());
        }
        finish(target_checks(&state, |name| {
            name == state.name || self.states.contains_key(name)
        }))?;

        tracing::debug!(puzzle_id = %self.id, state = %state.name, "state injected");
        self.upsert(state);
        Ok(())
    }

    /// Add or replace an action on an existing state.
    pub fn add_action(&mut self, state: &str, action: ActionDefinition) -> Result<(), ConfigError> {
        if !self.states.contains_key(&action.target_state) {
            return Err(ConfigIssue::UnknownTargetState {
                path: format!("/states/{state}/actions/{}", action.name),
                target: action.target_state,
            }
            .into());
        }
        let mut updated = self
            .states
            .get(state)
            .cloned()
            .ok_or_else(|| ConfigIssue::UnknownState(state.to_string()))?;

        tracing::debug!(puzzle_id = %self.id, state, action = %action.name, "action injected");
        updated.insert_action(action);
        self.upsert(updated);
        Ok(())
    }

    /// Return to the initial state and forget history.
    pub fn reset(&mut self) {
        if let Some(initial) = self.states.get(&self.initial_state) {
            self.current = initial.clone();
        }
        self.history.clear();
    }

    /// Attempt the named action from the current state.
    ///
    /// The exit guard of the current state and the enter guard of the target
    /// state are evaluated in that order, each bounded by `policy.timeout`.
    /// Nothing changes unless both pass. Notifying observers is the caller's
    /// job.
    pub async fn perform_action(
        &mut self,
        action: &str,
        oracle: &dyn GuardOracle,
        policy: &GuardPolicy,
    ) -> Result<ActionOutcome, TransitionError> {
        let Some(definition) = self.current.action(action) else {
            return Err(TransitionError::InvalidAction {
                action: action.to_string(),
                state: self.current.name.clone(),
            });
        };

        let Some(target) = self.states.get(&definition.target_state).cloned() else {
            return Err(TransitionError::UnknownTarget {
                action: action.to_string(),
                target: definition.target_state.clone(),
            });
        };

        let context = GuardContext {
            puzzle_id: self.id,
            from_state: self.current.name.clone(),
            to_state: target.name.clone(),
            action: action.to_string(),
        };

        let guards = [
            (GuardPhase::Exit, self.current.exit_guard.clone()),
            (GuardPhase::Enter, target.enter_guard.clone()),
        ];
        for (phase, guard) in guards {
            let Some(guard) = guard else { continue };
            let request = GuardRequest {
                phase,
                guard,
                context: context.clone(),
            };
            if let Err(reason) = check_guard(oracle, request, policy).await {
                tracing::warn!(
                    puzzle_id = %self.id,
                    action,
                    %reason,
                    "transition cancelled"
                );
                return Ok(ActionOutcome::Cancelled(reason));
            }
        }

        let record = TransitionRecord::now(context.from_state, context.to_state, context.action);
        self.history.push(record.clone());
        self.current = target;

        tracing::debug!(
            puzzle_id = %self.id,
            from = %record.from,
            to = %record.to,
            action = %record.action,
            "transition committed"
        );
        Ok(ActionOutcome::Committed(record))
    }

    fn upsert(&mut self, state: StateDefinition) {
        if state.name == self.current.name {
            self.current = state.clone();
        }
        self.states.insert(state.name.clone(), state);
    }
}

/// Evaluate one guard; rejection, oracle failure and timeout all cancel.
async fn check_guard(
    oracle: &dyn GuardOracle,
    request: GuardRequest,
    policy: &GuardPolicy,
) -> Result<(), CancelReason> {
    let evaluation = tokio::time::timeout(policy.timeout, oracle.evaluate(&request)).await;
    let GuardRequest { phase, guard, .. } = request;

    match evaluation {
        Ok(Ok(GuardDecision::Allow)) => Ok(()),
        Ok(Ok(GuardDecision::Reject { reason })) => Err(CancelReason::Rejected {
            phase,
            guard,
            reason,
        }),
        Ok(Err(err)) => Err(CancelReason::OracleFailed {
            phase,
            guard,
            message: err.to_string(),
        }),
        Err(_) => Err(CancelReason::TimedOut {
            phase,
            guard,
            timeout_ms: u64::try_from(policy.timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
