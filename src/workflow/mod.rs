// src/workflow/mod.rs

//! Turning validated workflow definitions into persisted workflows.

pub mod factory;

pub use factory::WorkflowFactory;
