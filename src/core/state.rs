//! State and action definitions.
//!
//! A puzzle's state table is made of [`StateDefinition`]s, each holding the
//! actions permitted from it. Definitions are plain data: they carry guard
//! *names* but never evaluate them.

use serde::{Deserialize, Serialize};

/// A named edge leading to a target state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    /// Action name, unique within its source state
    pub name: String,
    /// State entered when the action commits
    pub target_state: String,
}

impl ActionDefinition {
    /// Create an action leading to `target_state`.
    pub fn new(name: impl Into<String>, target_state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_state: target_state.into(),
        }
    }
}

/// A named node of the puzzle's state table.
///
/// Actions keep their declaration order, which is the order reported by
/// [`StateDefinition::action_names`].
///
/// # Example
///
/// ```rust
/// use puzzlebox::core::StateDefinition;
///
/// let closed = StateDefinition::new("Closed")
///     .with_action("Open", "Opened")
///     .with_action("Lock", "Locked")
///     .with_exit_guard("door-unjammed");
///
/// assert_eq!(closed.action_names(), vec!["Open", "Lock"]);
/// assert_eq!(closed.action("Lock").unwrap().target_state, "Locked");
/// assert!(!closed.is_terminal());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDefinition {
    /// State name, unique within the puzzle
    pub name: String,
    /// Keyed by action name, in declaration order
    #[serde(default, with = "action_map")]
    actions: Vec<ActionDefinition>,
    /// Guard consulted before a transition enters this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enter_guard: Option<String>,
    /// Guard consulted before a transition leaves this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_guard: Option<String>,
}

impl StateDefinition {
    /// Create a state with no actions and no guards.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            enter_guard: None,
            exit_guard: None,
        }
    }

    /// Add an action, replacing any existing action with the same name.
    pub fn with_action(mut self, name: impl Into<String>, target_state: impl Into<String>) -> Self {
        self.insert_action(ActionDefinition::new(name, target_state));
        self
    }

    /// Set the enter guard.
    pub fn with_enter_guard(mut self, guard: impl Into<String>) -> Self {
        self.enter_guard = Some(guard.into());
        self
    }

    /// Set the exit guard.
    pub fn with_exit_guard(mut self, guard: impl Into<String>) -> Self {
        self.exit_guard = Some(guard.into());
        self
    }

    /// Insert an action, keeping the position of a replaced one.
    ///
    /// Returns the previous definition when the name was already present.
    pub fn insert_action(&mut self, action: ActionDefinition) -> Option<ActionDefinition> {
        match self.actions.iter_mut().find(|a| a.name == action.name) {
            Some(existing) => Some(std::mem::replace(existing, action)),
            None => {
                self.actions.push(action);
                None
            }
        }
    }

    /// Look up an action by name.
    pub fn action(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// All actions in declaration order.
    pub fn actions(&self) -> &[ActionDefinition] {
        &self.actions
    }

    /// Action names in declaration order.
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name.as_str()).collect()
    }

    /// A state with no outgoing actions.
    pub fn is_terminal(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Actions as a JSON object keyed by action name, matching the raw
/// definition layout. Duplicate or empty names are rejected.
mod action_map {
    use super::ActionDefinition;
    use serde::de::{Error, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct EdgeRef<'a> {
        name: &'a str,
        target_state: &'a str,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Edge {
        target_state: String,
    }

    pub fn serialize<S>(actions: &[ActionDefinition], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(actions.len()))?;
        for action in actions {
            let edge = EdgeRef {
                name: &action.name,
                target_state: &action.target_state,
            };
            map.serialize_entry(&action.name, &edge)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<ActionDefinition>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ActionMapVisitor)
    }

    struct ActionMapVisitor;

    impl<'de> Visitor<'de> for ActionMapVisitor {
        type Value = Vec<ActionDefinition>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of action name to definition")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut actions: Vec<ActionDefinition> = Vec::new();
            while let Some((name, edge)) = map.next_entry::<String, Edge>()? {
                if name.is_empty() || edge.target_state.is_empty() {
                    return Err(A::Error::custom("action and target names must not be empty"));
                }
                if actions.iter().any(|a| a.name == name) {
                    return Err(A::Error::custom(format!("duplicate action '{name}'")));
                }
                actions.push(ActionDefinition::new(name, edge.target_state));
            }
            Ok(actions)
        }
    }
}
