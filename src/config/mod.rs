// src/config/mod.rs

//! Configuration loading and validation for stepwise.
//!
//! Responsibilities:
//! - Define the engine config and workflow definition data model (`model.rs`).
//! - Load both from disk (`loader.rs`).
//! - Validate definitions before anything is materialized (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    DefinitionFormat, load_definition, load_engine_config, load_engine_config_or_default,
    parse_definition,
};
pub use model::{
    EngineConfig, RawWorkflowDefinition, SchedulerSection, StepDefinition, StoreSection,
    WorkflowDefinition,
};
pub use validate::validate_engine_config;
