use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{ErrorType, PlaygroundError, Result};
use crate::preview::MaterializeMode;

/// Session settings. Every field has a default, so a config file only needs
/// the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Name of the root folder; the root's path is `/<root_name>`.
    pub root_name: String,
    /// Start from the starter project instead of an empty root.
    pub seed: bool,
    /// Root-level HTML file previewed when the active file is not HTML.
    pub entry_file: String,
    pub materialize: MaterializeMode,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        PlaygroundConfig {
            root_name: "PLAYBOX".to_string(),
            seed: true,
            entry_file: "index.html".to_string(),
            materialize: MaterializeMode::default(),
        }
    }
}

impl PlaygroundConfig {
    pub fn from_json(json: &str) -> Result<PlaygroundConfig> {
        let config: PlaygroundConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<PlaygroundConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PlaygroundError::new(
                ErrorType::ConfigError,
                format!("Could not read config file {}: {}", path.display(), e),
            )
        })?;
        let config = PlaygroundConfig::from_json(&contents)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (key, value) in [("root_name", &self.root_name), ("entry_file", &self.entry_file)] {
            if value.is_empty() || value.contains('/') || value == "." || value == ".." {
                return Err(PlaygroundError::new(
                    ErrorType::ConfigError,
                    format!("{} must be a plain file name, got {:?}", key, value),
                ));
            }
        }
        Ok(())
    }
}
