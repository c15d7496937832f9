//! Definition errors.

use thiserror::Error;

/// A single problem found while validating a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    #[error("Definition must be an object")]
    NotAnObject,

    #[error("Initial state not specified")]
    MissingInitialState,

    #[error("states must be a mapping of state name to definition")]
    StatesNotMapping,

    #[error("Initial state '{0}' is not defined in states")]
    UnknownInitialState(String),

    #[error("State '{0}' is defined more than once")]
    DuplicateState(String),

    #[error("State '{0}' is not defined")]
    UnknownState(String),

    #[error("{path}: target state '{target}' is not defined")]
    UnknownTargetState { path: String, target: String },

    #[error("{path}: {message}")]
    Malformed { path: String, message: String },
}

impl ConfigIssue {
    pub(crate) fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur when parsing or validating a puzzle definition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Definition is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Definition is invalid: {}", summarize(.0))]
    Invalid(Vec<ConfigIssue>),
}

impl ConfigError {
    /// Issues found during validation; empty for parse failures.
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            Self::Parse(_) => &[],
            Self::Invalid(issues) => issues,
        }
    }
}

impl From<ConfigIssue> for ConfigError {
    fn from(issue: ConfigIssue) -> Self {
        Self::Invalid(vec![issue])
    }
}

fn summarize(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lists_every_issue() {
        let err = ConfigError::Invalid(vec![
            ConfigIssue::MissingInitialState,
            ConfigIssue::malformed("/states/A", "must be an object"),
        ]);

        assert_eq!(
            err.to_string(),
            "Definition is invalid: Initial state not specified; /states/A: must be an object"
        );
        assert_eq!(err.issues().len(), 2);
    }

    #[test]
    fn parse_error_has_no_issues() {
        let err = ConfigError::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
        assert!(err.issues().is_empty());
        assert!(err.to_string().starts_with("Definition is not valid JSON"));
    }
}
