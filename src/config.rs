//! Runtime settings.
//!
//! Settings are plain data with defaults; they can be loaded from TOML:
//!
//! ```toml
//! guard_timeout_ms = 5000
//! delivery_timeout_ms = 2000
//! history_limit = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_GUARD_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_HISTORY_LIMIT: usize = 1_000;

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings are not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("history_limit must be greater than zero")]
    ZeroHistoryLimit,
}

/// Timeouts bounding every suspension point of the core, plus the per-puzzle
/// history cap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Upper bound for one guard oracle call
    pub guard_timeout_ms: u64,
    /// Upper bound for one delivery to one subscriber
    pub delivery_timeout_ms: u64,
    /// Most recent transitions each puzzle keeps
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            guard_timeout_ms: DEFAULT_GUARD_TIMEOUT_MS,
            delivery_timeout_ms: DEFAULT_DELIVERY_TIMEOUT_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Settings {
    /// Parse and validate TOML text. Missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.guard_timeout_ms == 0 {
            return Err(SettingsError::ZeroTimeout("guard_timeout_ms"));
        }
        if self.delivery_timeout_ms == 0 {
            return Err(SettingsError::ZeroTimeout("delivery_timeout_ms"));
        }
        if self.history_limit == 0 {
            return Err(SettingsError::ZeroHistoryLimit);
        }
        Ok(())
    }

    pub fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn guard_policy(&self) -> GuardPolicy {
        GuardPolicy::new(self.guard_timeout())
    }
}

/// How guard evaluations are bounded during a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuardPolicy {
    pub timeout: Duration,
}

impl GuardPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_GUARD_TIMEOUT_MS))
    }
}
