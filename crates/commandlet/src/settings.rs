//! Host-configurable behavior knobs.

use mdsync_core::constants::{CLEAR_OUTPUT_ENV_VAR, DETECT_CONFLICTS_ENV_VAR};
use serde::{Deserialize, Serialize};

/// Operation-level settings, deserializable from a host config document and
/// overridable per-process through environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Clear the output channel before each command run
    pub clear_output_before_each_command: bool,
    /// Run conflict detection against the sync-state cache before
    /// deploy/retrieve operations
    pub detect_conflicts_at_sync: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clear_output_before_each_command: false,
            detect_conflicts_at_sync: false,
        }
    }
}

impl Settings {
    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = env_flag(CLEAR_OUTPUT_ENV_VAR) {
            self.clear_output_before_each_command = value;
        }
        if let Some(value) = env_flag(DETECT_CONFLICTS_ENV_VAR) {
            self.detect_conflicts_at_sync = value;
        }
        self
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let settings = Settings::default();
        assert!(!settings.clear_output_before_each_command);
        assert!(!settings.detect_conflicts_at_sync);
    }

    #[test]
    fn flag_values_parse_loosely() {
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn deserializes_from_camel_case_document() {
        let settings: Settings = serde_json::from_str(
            r#"{"clearOutputBeforeEachCommand": true, "detectConflictsAtSync": true}"#,
        )
        .unwrap();
        assert!(settings.clear_output_before_each_command);
        assert!(settings.detect_conflicts_at_sync);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }
}
