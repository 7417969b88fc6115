//! Configuration file loading. Supports automatic format detection based
//! on file extension (TOML or YAML).

use crate::config::PipelineConfig;
use std::path::Path;

/// Configuration file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("config file has no extension")]
    NoExtension,

    #[error("unsupported config file format: {0}")]
    UnsupportedFormat(String),
}

/// Loads a [`PipelineConfig`] from a TOML or YAML file, dispatching on
/// the file extension.
pub fn load_from_file(path: &Path) -> Result<PipelineConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => load_from_toml(&contents),
        Some("yaml") | Some("yml") => load_from_yaml(&contents),
        Some(other) => Err(ConfigFileError::UnsupportedFormat(other.to_string())),
        None => Err(ConfigFileError::NoExtension),
    }
}

pub fn load_from_toml(contents: &str) -> Result<PipelineConfig, ConfigFileError> {
    toml::from_str(contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))
}

pub fn load_from_yaml(contents: &str) -> Result<PipelineConfig, ConfigFileError> {
    serde_yaml::from_str(contents).map_err(|e| ConfigFileError::YamlParse(e.to_string()))
}
