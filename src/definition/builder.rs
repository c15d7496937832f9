//! Builder for constructing definitions in code.

use crate::core::StateDefinition;
use crate::definition::error::{ConfigError, ConfigIssue};
use crate::definition::{finish, table_checks, Check, PuzzleDefinition};
use std::collections::BTreeMap;
use stillwater::validation::Validation;

/// Builder for [`PuzzleDefinition`] with a fluent API.
///
/// `build()` runs the same validation as parsing raw configuration.
///
/// # Example
///
/// ```rust
/// use puzzlebox::core::StateDefinition;
/// use puzzlebox::definition::PuzzleDefinition;
///
/// let definition = PuzzleDefinition::builder()
///     .initial("Closed")
///     .state(StateDefinition::new("Closed").with_action("Open", "Opened"))
///     .state(StateDefinition::new("Opened"))
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.initial_state(), "Closed");
/// ```
#[derive(Clone, Debug, Default)]
pub struct PuzzleDefinitionBuilder {
    initial: Option<String>,
    states: Vec<StateDefinition>,
}

impl PuzzleDefinitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: impl Into<String>) -> Self {
        self.initial = Some(state.into());
        self
    }

    /// Add a state.
    pub fn state(mut self, state: StateDefinition) -> Self {
        self.states.push(state);
        self
    }

    /// Add multiple states at once.
    pub fn states(mut self, states: impl IntoIterator<Item = StateDefinition>) -> Self {
        self.states.extend(states);
        self
    }

    /// Validate and build the definition.
    pub fn build(self) -> Result<PuzzleDefinition, ConfigError> {
        let mut checks: Vec<Check> = Vec::new();
        let mut table = BTreeMap::new();

        for state in self.states {
            if state.name.is_empty() {
                checks.push(Validation::fail(ConfigIssue::malformed(
                    "/states",
                    "state name must not be empty",
                )));
            } else if table.contains_key(&state.name) {
                checks.push(Validation::fail(ConfigIssue::DuplicateState(
                    state.name.clone(),
                )));
            } else {
                table.insert(state.name.clone(), state);
            }
        }

        match &self.initial {
            Some(initial) => {
                checks.extend(table_checks(initial, &table, |name| table.contains_key(name)))
            }
            None => checks.push(Validation::fail(ConfigIssue::MissingInitialState)),
        }

        finish(checks)?;

        let initial_state = self.initial.ok_or(ConfigIssue::MissingInitialState)?;
        Ok(PuzzleDefinition {
            initial_state,
            states: table,
        })
    }
}
