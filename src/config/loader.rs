// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{EngineConfig, RawWorkflowDefinition, WorkflowDefinition};
use crate::config::validate::validate_engine_config;
use crate::errors::{Result, StepwiseError};

/// Serialization format of a workflow definition document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Yaml,
    Json,
    Toml,
}

impl DefinitionFormat {
    /// Pick the format from a file extension. Unknown or missing extensions
    /// are treated as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => DefinitionFormat::Json,
            Some("toml") => DefinitionFormat::Toml,
            _ => DefinitionFormat::Yaml,
        }
    }
}

/// Load and validate the engine configuration from a TOML file.
pub fn load_engine_config(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: EngineConfig = toml::from_str(&contents)?;
    validate_engine_config(&config)?;
    Ok(config)
}

/// Like [`load_engine_config`], but falls back to defaults when `path` does
/// not exist.
pub fn load_engine_config_or_default(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no engine config found; using defaults");
        return Ok(EngineConfig::default());
    }
    load_engine_config(path)
}

/// Parse a workflow definition document from a string.
///
/// This only deserializes; see [`load_definition`] for the validated entry
/// point.
pub fn parse_definition(contents: &str, format: DefinitionFormat) -> Result<RawWorkflowDefinition> {
    let raw: RawWorkflowDefinition = match format {
        DefinitionFormat::Yaml => serde_yaml::from_str(contents)?,
        DefinitionFormat::Json => serde_json::from_str(contents)?,
        DefinitionFormat::Toml => toml::from_str(contents)?,
    };
    Ok(raw)
}

/// Load a workflow definition from disk and validate it.
///
/// - Reads YAML, JSON or TOML depending on the file extension.
/// - Rejects empty step lists, duplicate step numbers and dependency cycles.
///
/// An unreadable or malformed document is a configuration error.
pub fn load_definition(path: impl AsRef<Path>) -> Result<WorkflowDefinition> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        StepwiseError::ConfigError(format!(
            "cannot read workflow definition {}: {e}",
            path.display()
        ))
    })?;

    let raw = parse_definition(&contents, DefinitionFormat::from_path(path))?;
    WorkflowDefinition::try_from(raw)
}
