//! Scoring configuration
//!
//! Thresholds can be tuned per deployment from a JSON file. Missing fields
//! fall back to the built-in defaults.

use std::fs;
use std::path::Path;

use crate::logic::risk::ScoringThresholds;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    SerializationError(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO Error: {}", e),
            ConfigError::SerializationError(e) => write!(f, "Serialization Error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid thresholds: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::SerializationError(err)
    }
}

/// Load and validate thresholds from a JSON file
pub fn load_thresholds(path: &Path) -> Result<ScoringThresholds, ConfigError> {
    let data = fs::read(path)?;
    let thresholds: ScoringThresholds = serde_json::from_slice(&data)?;
    thresholds.validate().map_err(ConfigError::Invalid)?;

    log::info!("Loaded scoring thresholds from {:?}", path);
    Ok(thresholds)
}

/// Write thresholds as pretty JSON
pub fn save_thresholds(thresholds: &ScoringThresholds, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(thresholds)?;
    fs::write(path, json)?;
    Ok(())
}
