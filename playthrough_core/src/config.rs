//! Playthrough configuration, loadable from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings shared by the engine and the session serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaythroughConfig {
    /// Title exported for history entries whose node no longer exists.
    pub missing_node_title: String,

    /// Keep parsed gates between calls instead of re-parsing every time.
    pub cache_gates: bool,
}

impl Default for PlaythroughConfig {
    fn default() -> Self {
        Self {
            missing_node_title: "(missing node)".to_string(),
            cache_gates: true,
        }
    }
}

impl PlaythroughConfig {
    /// Parse configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
