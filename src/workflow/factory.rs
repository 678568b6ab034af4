// src/workflow/factory.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::model::WorkflowDefinition;
use crate::errors::{Result, StepwiseError};
use crate::jobs::JobRegistry;
use crate::model::{Task, Workflow};
use crate::store::Store;
use crate::types::TaskId;

/// Creates a [`Workflow`] and its queued [`Task`]s from a definition.
pub struct WorkflowFactory {
    store: Arc<dyn Store>,
    registry: Option<Arc<JobRegistry>>,
}

impl WorkflowFactory {
    pub fn new(store: Arc<dyn Store>, registry: Option<Arc<JobRegistry>>) -> Self {
        Self { store, registry }
    }

    /// Persist a new workflow for `client_id` with one queued task per step.
    ///
    /// Every task carries the same `input` payload. `dependsOn` step numbers
    /// are resolved to task ids before anything is written, and all tasks are
    /// inserted in one batch; a reference to a step that does not exist is
    /// dropped with a warning.
    ///
    /// When the factory holds a registry, steps naming an unregistered task
    /// type are rejected before anything is written.
    pub async fn materialize(
        &self,
        definition: &WorkflowDefinition,
        client_id: &str,
        input: &str,
    ) -> Result<Workflow> {
        self.check_task_types(definition)?;

        let mut workflow = Workflow::new(client_id);

        let mut tasks: Vec<Task> = definition
            .steps
            .iter()
            .map(|step| {
                Task::new_queued(
                    workflow.workflow_id,
                    client_id,
                    step.task_type.clone(),
                    input,
                    step.step_number,
                )
            })
            .collect();

        let step_to_task: HashMap<u32, TaskId> =
            tasks.iter().map(|t| (t.step_number, t.task_id)).collect();

        for (step, task) in definition.steps.iter().zip(tasks.iter_mut()) {
            let Some(dep_step) = step.depends_on else {
                continue;
            };
            match step_to_task.get(&dep_step) {
                Some(dep_id) => task.depends_on = Some(*dep_id),
                None => warn!(
                    workflow = %definition.name,
                    task_id = %task.task_id,
                    step = step.step_number,
                    depends_on = dep_step,
                    "dependency names a step that does not exist; dropping it"
                ),
            }
        }

        // Tasks become visible to schedulers only with their dependencies set.
        self.store.insert_workflow(&workflow).await?;
        self.store.insert_tasks(&tasks).await?;

        debug!(
            workflow_id = %workflow.workflow_id,
            tasks = tasks.len(),
            "tasks created"
        );
        info!(
            workflow_id = %workflow.workflow_id,
            workflow = %definition.name,
            client_id,
            "workflow created"
        );

        workflow.tasks = tasks;
        Ok(workflow)
    }

    fn check_task_types(&self, definition: &WorkflowDefinition) -> Result<()> {
        let Some(registry) = &self.registry else {
            return Ok(());
        };
        match definition
            .steps
            .iter()
            .find(|s| !registry.contains(&s.task_type))
        {
            Some(step) => Err(StepwiseError::UnknownTaskType(step.task_type.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{RawWorkflowDefinition, StepDefinition};
    use crate::store::MemoryStore;
    use crate::types::{TaskStatus, WorkflowStatus};

    fn definition(steps: &[(&str, u32, Option<u32>)]) -> WorkflowDefinition {
        let raw = RawWorkflowDefinition {
            name: "test".to_string(),
            steps: steps
                .iter()
                .map(|(task_type, step_number, depends_on)| StepDefinition {
                    task_type: task_type.to_string(),
                    step_number: *step_number,
                    depends_on: *depends_on,
                })
                .collect(),
        };
        WorkflowDefinition::try_from(raw).unwrap()
    }

    #[tokio::test]
    async fn resolves_step_numbers_to_task_ids() {
        let store = Arc::new(MemoryStore::new());
        let factory = WorkflowFactory::new(store.clone(), None);
        let def = definition(&[("a", 1, None), ("b", 2, Some(1)), ("c", 3, Some(2))]);

        let workflow = factory.materialize(&def, "client-1", "{}").await.unwrap();

        let stored = store.find_workflow(workflow.workflow_id).await.unwrap().unwrap();
        assert_eq!(stored.status, WorkflowStatus::Initial);
        assert_eq!(stored.tasks.len(), 3);
        assert!(stored.tasks.iter().all(|t| t.status == TaskStatus::Queued));
        assert!(stored.tasks.iter().all(|t| t.input == "{}"));
        assert_eq!(stored.tasks[0].depends_on, None);
        assert_eq!(stored.tasks[1].depends_on, Some(stored.tasks[0].task_id));
        assert_eq!(stored.tasks[2].depends_on, Some(stored.tasks[1].task_id));
    }

    #[tokio::test]
    async fn dangling_dependency_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let factory = WorkflowFactory::new(store.clone(), None);
        let def = definition(&[("a", 1, None), ("b", 2, Some(9))]);

        let workflow = factory.materialize(&def, "client-1", "{}").await.unwrap();

        let stored = store.find_workflow(workflow.workflow_id).await.unwrap().unwrap();
        assert_eq!(stored.tasks.len(), 2);
        assert!(stored.tasks.iter().all(|t| t.depends_on.is_none()));
    }

    #[tokio::test]
    async fn unknown_task_type_is_rejected_before_writing() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(JobRegistry::with_builtin_jobs(store.clone()));
        let factory = WorkflowFactory::new(store.clone(), Some(registry));
        let def = definition(&[("polygonArea", 1, None), ("analysis", 2, Some(1))]);

        let err = factory.materialize(&def, "client-1", "{}").await.unwrap_err();
        assert!(matches!(err, StepwiseError::UnknownTaskType(t) if t == "analysis"));
        assert!(store.find_tasks_by_status(TaskStatus::Queued).await.unwrap().is_empty());
    }
}
