//! Engine configuration

use cadence_core::{CadenceError, Result};
use serde::{Deserialize, Serialize};

/// Tunables applied when the engine starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many recycled wait sources the driving thread keeps pooled
    pub max_pooled_waiters: usize,
    /// Emit a debug log line per `handle_once`
    pub trace_frames: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pooled_waiters: 256,
            trace_frames: false,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML; missing fields take their defaults
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|err| CadenceError::InvalidConfig(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_pooled_waiters, 256);
        assert!(!config.trace_frames);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = EngineConfig::from_toml_str("max_pooled_waiters = 32").unwrap();
        assert_eq!(config.max_pooled_waiters, 32);
        assert!(!config.trace_frames);
    }

    #[test]
    fn test_parse_empty_toml() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        let err = EngineConfig::from_toml_str("trace_frames = \"yes\"").unwrap_err();
        assert!(matches!(err, CadenceError::InvalidConfig(_)));
    }

    #[test]
    fn test_round_trip() {
        let config = EngineConfig {
            max_pooled_waiters: 64,
            trace_frames: true,
        };
        let text = toml::to_string(&config).unwrap();
        let parsed = EngineConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
