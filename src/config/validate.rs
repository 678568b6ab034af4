// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{EngineConfig, RawWorkflowDefinition, WorkflowDefinition};
use crate::errors::{Result, StepwiseError};

impl TryFrom<RawWorkflowDefinition> for WorkflowDefinition {
    type Error = StepwiseError;

    fn try_from(raw: RawWorkflowDefinition) -> std::result::Result<Self, Self::Error> {
        validate_raw_definition(&raw)?;
        Ok(WorkflowDefinition::new_unchecked(raw.name, raw.steps))
    }
}

/// Reject engine settings that would stall the scheduler.
pub fn validate_engine_config(cfg: &EngineConfig) -> Result<()> {
    if cfg.scheduler.poll_interval_ms == 0 {
        return Err(StepwiseError::ConfigError(
            "[scheduler].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.scheduler.max_concurrent_tasks == 0 {
        return Err(StepwiseError::ConfigError(
            "[scheduler].max_concurrent_tasks must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.store.database_url.trim().is_empty() {
        return Err(StepwiseError::ConfigError(
            "[store].database_url must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_raw_definition(def: &RawWorkflowDefinition) -> Result<()> {
    ensure_has_steps(def)?;
    validate_task_types(def)?;
    validate_unique_step_numbers(def)?;
    validate_dependency_graph(def)?;
    Ok(())
}

fn ensure_has_steps(def: &RawWorkflowDefinition) -> Result<()> {
    if def.steps.is_empty() {
        return Err(StepwiseError::InvalidDefinition(format!(
            "workflow '{}' must contain at least one step",
            def.name
        )));
    }
    Ok(())
}

fn validate_task_types(def: &RawWorkflowDefinition) -> Result<()> {
    for step in def.steps.iter() {
        if step.task_type.trim().is_empty() {
            return Err(StepwiseError::InvalidDefinition(format!(
                "step {} of workflow '{}' has an empty taskType",
                step.step_number, def.name
            )));
        }
    }
    Ok(())
}

fn validate_unique_step_numbers(def: &RawWorkflowDefinition) -> Result<()> {
    let mut seen = HashSet::new();
    for step in def.steps.iter() {
        if !seen.insert(step.step_number) {
            return Err(StepwiseError::InvalidDefinition(format!(
                "workflow '{}' declares step number {} more than once",
                def.name, step.step_number
            )));
        }
    }
    Ok(())
}

fn validate_dependency_graph(def: &RawWorkflowDefinition) -> Result<()> {
    // Edge direction: dependency -> step.
    //
    // References to step numbers that do not exist are skipped here; the
    // workflow factory drops them with a warning.
    let mut graph: DiGraphMap<u32, ()> = DiGraphMap::new();

    for step in def.steps.iter() {
        graph.add_node(step.step_number);
    }

    for step in def.steps.iter() {
        if let Some(dep) = step.depends_on {
            if graph.contains_node(dep) {
                graph.add_edge(dep, step.step_number, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(StepwiseError::DependencyCycle(format!(
            "cycle detected in workflow '{}' involving step {}",
            def.name,
            cycle.node_id()
        ))),
    }
}
