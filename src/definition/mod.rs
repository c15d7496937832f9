//! Validated puzzle definitions.
//!
//! Raw configuration (JSON text or an already-parsed [`serde_json::Value`])
//! is turned into an immutable [`PuzzleDefinition`]. Validation does not stop
//! at the first problem: every malformed entry is collected with
//! Stillwater's `Validation` and reported together in
//! [`ConfigError::Invalid`].
//!
//! # Raw format
//!
//! ```json
//! {
//!   "initialState": "Closed",
//!   "states": {
//!     "Closed": {
//!       "actions": { "Open": { "targetState": "Opened" } },
//!       "exitGuard": "door-unjammed"
//!     },
//!     "Opened": {}
//!   }
//! }
//! ```
//!
//! Within `actions`, the map key is the action's name. A `name` field inside
//! an action value is informational only and never overrides the key.

pub mod builder;
pub mod error;

pub use builder::PuzzleDefinitionBuilder;
pub use error::{ConfigError, ConfigIssue};

use crate::core::{ActionDefinition, StateDefinition};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Result of one validation check.
pub(crate) type Check = Validation<(), NonEmptyVec<ConfigIssue>>;

/// Validated, immutable description of a puzzle's state table.
///
/// Invariants: `initial_state` names a defined state, and every action
/// targets a defined state.
///
/// # Example
///
/// ```rust
/// use puzzlebox::definition::PuzzleDefinition;
///
/// let definition = PuzzleDefinition::from_json_str(r#"{
///     "initialState": "Closed",
///     "states": {
///         "Closed": { "actions": { "Open": { "targetState": "Opened" } } },
///         "Opened": {}
///     }
/// }"#).unwrap();
///
/// assert_eq!(definition.initial_state(), "Closed");
/// assert_eq!(definition.state("Closed").unwrap().action_names(), vec!["Open"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleDefinition {
    initial_state: String,
    states: BTreeMap<String, StateDefinition>,
}

impl PuzzleDefinition {
    /// Parse and validate JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    /// Validate an already-parsed structured record.
    pub fn from_value(raw: &Value) -> Result<Self, ConfigError> {
        let root = raw.as_object().ok_or(ConfigIssue::NotAnObject)?;
        let mut checks: Vec<Check> = Vec::new();

        let initial_state = match root.get("initialState") {
            Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
            None | Some(Value::Null) => {
                checks.push(Validation::fail(ConfigIssue::MissingInitialState));
                None
            }
            Some(_) => {
                checks.push(Validation::fail(ConfigIssue::malformed(
                    "/initialState",
                    "must be a non-empty string",
                )));
                None
            }
        };

        let mut states = BTreeMap::new();
        let declared = match root.get("states") {
            Some(Value::Object(entries)) => {
                for (name, entry) in entries {
                    if let Some(state) = parse_state(name, entry, &mut checks) {
                        states.insert(name.clone(), state);
                    }
                }
                Some(entries)
            }
            _ => {
                checks.push(Validation::fail(ConfigIssue::StatesNotMapping));
                None
            }
        };

        // Names resolve against every declared key, including entries that
        // failed to parse, so one malformed state reports exactly one issue.
        if let (Some(initial), Some(declared)) = (&initial_state, declared) {
            checks.extend(table_checks(initial, &states, |name| {
                declared.contains_key(name)
            }));
        }

        finish(checks)?;

        let initial_state = initial_state.ok_or(ConfigIssue::MissingInitialState)?;
        Ok(Self {
            initial_state,
            states,
        })
    }

    /// Start building a definition in code.
    pub fn builder() -> PuzzleDefinitionBuilder {
        PuzzleDefinitionBuilder::new()
    }

    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    pub fn states(&self) -> &BTreeMap<String, StateDefinition> {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&StateDefinition> {
        self.states.get(name)
    }

    /// Split into the initial state name and the state table.
    pub fn into_parts(self) -> (String, BTreeMap<String, StateDefinition>) {
        (self.initial_state, self.states)
    }

    /// Render back to the raw configuration layout.
    pub fn to_json_value(&self) -> Value {
        let states: Map<String, Value> = self
            .states
            .iter()
            .map(|(name, state)| (name.clone(), state_to_value(state)))
            .collect();

        let mut root = Map::new();
        root.insert(
            "initialState".to_string(),
            Value::String(self.initial_state.clone()),
        );
        root.insert("states".to_string(), Value::Object(states));
        Value::Object(root)
    }
}

impl FromStr for PuzzleDefinition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json_str(s)
    }
}

/// Escape one JSON pointer segment.
fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn pointer(segments: &[&str]) -> String {
    segments.iter().fold(String::new(), |mut path, segment| {
        path.push('/');
        path.push_str(&escape(segment));
        path
    })
}

fn parse_state(name: &str, entry: &Value, checks: &mut Vec<Check>) -> Option<StateDefinition> {
    let path = pointer(&["states", name]);

    if name.is_empty() {
        checks.push(Validation::fail(ConfigIssue::malformed(
            path,
            "state name must not be empty",
        )));
        return None;
    }

    let fields = match entry {
        Value::Null => return Some(StateDefinition::new(name)),
        Value::Object(fields) => fields,
        _ => {
            checks.push(Validation::fail(ConfigIssue::malformed(
                path,
                "must be an object",
            )));
            return None;
        }
    };

    let mut state = StateDefinition::new(name);
    state.enter_guard = parse_guard(fields, "enterGuard", name, checks);
    state.exit_guard = parse_guard(fields, "exitGuard", name, checks);

    match fields.get("actions") {
        None | Some(Value::Null) => {}
        Some(Value::Object(actions)) => {
            for (action_name, action) in actions {
                if let Some(action) = parse_action(name, action_name, action, checks) {
                    state.insert_action(action);
                }
            }
        }
        Some(_) => checks.push(Validation::fail(ConfigIssue::malformed(
            pointer(&["states", name, "actions"]),
            "must be a mapping of action name to definition",
        ))),
    }

    Some(state)
}

fn parse_guard(
    fields: &Map<String, Value>,
    key: &str,
    state: &str,
    checks: &mut Vec<Check>,
) -> Option<String> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(guard)) if !guard.is_empty() => Some(guard.clone()),
        Some(_) => {
            checks.push(Validation::fail(ConfigIssue::malformed(
                pointer(&["states", state, key]),
                "must be a non-empty string",
            )));
            None
        }
    }
}

fn parse_action(
    state: &str,
    name: &str,
    entry: &Value,
    checks: &mut Vec<Check>,
) -> Option<ActionDefinition> {
    let path = pointer(&["states", state, "actions", name]);

    if name.is_empty() {
        checks.push(Validation::fail(ConfigIssue::malformed(
            path,
            "action name must not be empty",
        )));
        return None;
    }

    let Some(fields) = entry.as_object() else {
        checks.push(Validation::fail(ConfigIssue::malformed(
            path,
            "must be an object",
        )));
        return None;
    };

    if let Some(Value::String(embedded)) = fields.get("name") {
        if embedded != name {
            tracing::debug!(
                state,
                action = name,
                embedded = embedded.as_str(),
                "embedded action name differs from key; using key"
            );
        }
    }

    match fields.get("targetState") {
        Some(Value::String(target)) if !target.is_empty() => {
            Some(ActionDefinition::new(name, target.clone()))
        }
        None | Some(Value::Null) => {
            checks.push(Validation::fail(ConfigIssue::malformed(
                format!("{path}/targetState"),
                "is required",
            )));
            None
        }
        Some(_) => {
            checks.push(Validation::fail(ConfigIssue::malformed(
                format!("{path}/targetState"),
                "must be a non-empty string",
            )));
            None
        }
    }
}

fn state_to_value(state: &StateDefinition) -> Value {
    let actions: Map<String, Value> = state
        .actions()
        .iter()
        .map(|action| {
            let mut fields = Map::new();
            fields.insert("name".to_string(), Value::String(action.name.clone()));
            fields.insert(
                "targetState".to_string(),
                Value::String(action.target_state.clone()),
            );
            (action.name.clone(), Value::Object(fields))
        })
        .collect();

    let mut fields = Map::new();
    fields.insert("actions".to_string(), Value::Object(actions));
    if let Some(guard) = &state.enter_guard {
        fields.insert("enterGuard".to_string(), Value::String(guard.clone()));
    }
    if let Some(guard) = &state.exit_guard {
        fields.insert("exitGuard".to_string(), Value::String(guard.clone()));
    }
    Value::Object(fields)
}

/// Cross-reference checks over a state table.
///
/// `is_known` decides which names count as defined states.
pub(crate) fn table_checks<F>(
    initial: &str,
    states: &BTreeMap<String, StateDefinition>,
    is_known: F,
) -> Vec<Check>
where
    F: Fn(&str) -> bool,
{
    let mut checks = Vec::new();

    if !is_known(initial) {
        checks.push(Validation::fail(ConfigIssue::UnknownInitialState(
            initial.to_string(),
        )));
    }

    for state in states.values() {
        checks.extend(target_checks(state, &is_known));
    }

    checks
}

/// Checks that every action of `state` targets a known state.
pub(crate) fn target_checks<F>(state: &StateDefinition, is_known: F) -> Vec<Check>
where
    F: Fn(&str) -> bool,
{
    state
        .actions()
        .iter()
        .filter(|action| !is_known(&action.target_state))
        .map(|action| {
            Validation::fail(ConfigIssue::UnknownTargetState {
                path: pointer(&["states", &state.name, "actions", &action.name]),
                target: action.target_state.clone(),
            })
        })
        .collect()
}

/// Collapse accumulated checks into a single result.
pub(crate) fn finish(checks: Vec<Check>) -> Result<(), ConfigError> {
    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(issues) => Err(ConfigError::Invalid(issues.iter().cloned().collect())),
    }
}
