//! Editor Configuration
//!
//! Timing and layout defaults for the editing engine. Every field has a
//! default, so a config file only needs to name the values it overrides.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};
use crate::graph::Position;

/// Default quiescence window before a coalesced write-back fires.
const DEFAULT_PERSIST_DEBOUNCE_MS: u64 = 1000;

/// Default delay between binding a controller and reading host state.
const DEFAULT_ACTIVATION_DELAY_MS: u64 = 100;

/// Default base name for generated states.
pub const DEFAULT_STATE_NAME: &str = "New State";

/// Default base name for generated parameters.
pub const DEFAULT_PARAMETER_NAME: &str = "New Parameter";

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Trailing-edge debounce window for persistence, in milliseconds.
    pub persist_debounce_ms: u64,

    /// Delay before a newly bound controller is activated, in milliseconds.
    pub activation_delay_ms: u64,

    /// Base name used when a state is added without a name.
    pub default_state_name: String,

    /// Base name used when a parameter is added without a name.
    pub default_parameter_name: String,

    /// Position of freshly created normal states.
    pub state_position: Position,

    /// Position of the AnyState pseudo-state in a bare layer.
    pub any_state_position: Position,

    /// Position of the Entry pseudo-state in a bare layer.
    pub entry_position: Position,

    /// Position of the Exit pseudo-state in a bare layer.
    pub exit_position: Position,

    /// Per-index offset applied to states rebuilt from authoritative data.
    pub import_stagger: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            persist_debounce_ms: DEFAULT_PERSIST_DEBOUNCE_MS,
            activation_delay_ms: DEFAULT_ACTIVATION_DELAY_MS,
            default_state_name: DEFAULT_STATE_NAME.to_string(),
            default_parameter_name: DEFAULT_PARAMETER_NAME.to_string(),
            state_position: Position::new(400.0, 50.0),
            any_state_position: Position::new(120.0, 40.0),
            entry_position: Position::new(120.0, 180.0),
            exit_position: Position::new(600.0, 180.0),
            import_stagger: 24.0,
        }
    }
}

impl EditorConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| EditorError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: EditorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override the persistence debounce window.
    pub fn with_persist_debounce_ms(mut self, ms: u64) -> Self {
        self.persist_debounce_ms = ms;
        self
    }

    /// Override the activation delay.
    pub fn with_activation_delay_ms(mut self, ms: u64) -> Self {
        self.activation_delay_ms = ms;
        self
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    pub fn activation_delay(&self) -> Duration {
        Duration::from_millis(self.activation_delay_ms)
    }

    /// Reject configurations the store cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.default_state_name.trim().is_empty() {
            return Err(EditorError::InvalidConfig {
                reason: "defaultStateName must not be empty".to_string(),
            });
        }
        if self.default_parameter_name.trim().is_empty() {
            return Err(EditorError::InvalidConfig {
                reason: "defaultParameterName must not be empty".to_string(),
            });
        }
        if !self.import_stagger.is_finite() {
            return Err(EditorError::InvalidConfig {
                reason: "importStagger must be finite".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.persist_debounce(), Duration::from_millis(1000));
        assert_eq!(config.activation_delay(), Duration::from_millis(100));
        assert_eq!(config.default_state_name, "New State");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("editor.json");
        fs::write(&path, r#"{ "persistDebounceMs": 250 }"#).unwrap();

        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config.persist_debounce_ms, 250);
        assert_eq!(config.activation_delay_ms, DEFAULT_ACTIVATION_DELAY_MS);
        assert_eq!(config.exit_position, Position::new(600.0, 180.0));
    }

    #[test]
    fn test_load_rejects_empty_state_name() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("editor.json");
        fs::write(&path, r#"{ "defaultStateName": "  " }"#).unwrap();

        let err = EditorConfig::load(&path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_load_missing_file() {
        let err = EditorConfig::load(Path::new("/nonexistent/editor.json")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_READ_ERROR");
    }
}
