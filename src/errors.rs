// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum StepwiseError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(String),

    #[error("Dependency cycle in workflow definition: {0}")]
    DependencyCycle(String),

    #[error("No job found for task type: {0}")]
    UnknownTaskType(String),

    #[error("Job already registered for task type: {0}")]
    DuplicateTaskType(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepwiseError {
    /// Configuration-class errors are fatal at load/registration time and are
    /// never retried by the scheduler.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StepwiseError::ConfigError(_)
                | StepwiseError::InvalidDefinition(_)
                | StepwiseError::DependencyCycle(_)
                | StepwiseError::UnknownTaskType(_)
                | StepwiseError::DuplicateTaskType(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StepwiseError>;
