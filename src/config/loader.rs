//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::builder::EngineBuilder;
use crate::config::schema::EngineSettings;
use crate::config::validation::{validate_settings, ValidationErrors};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

/// Parse and validate settings from TOML text.
pub fn parse_settings(content: &str) -> Result<EngineSettings, ConfigError> {
    let settings: EngineSettings = toml::from_str(content)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<EngineSettings, ConfigError> {
    let content = fs::read_to_string(path)?;
    let settings = parse_settings(&content)?;
    tracing::info!(path = %path.display(), "Engine settings loaded");
    Ok(settings)
}

/// Load a file into a builder so callers can still override individual fields.
pub fn load_builder(path: &Path) -> Result<EngineBuilder, ConfigError> {
    load_settings(path).map(EngineBuilder::from_settings)
}
