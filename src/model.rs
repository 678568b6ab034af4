// src/model.rs

//! Persisted entities: workflows, their tasks, and captured task results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ResultId, TaskId, TaskStatus, WorkflowId, WorkflowStatus};

/// One unit of work within a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: TaskId,
    pub workflow_id: WorkflowId,
    pub client_id: String,
    /// Selects the job implementation through the registry.
    pub task_type: String,
    /// Opaque input payload shared by every task of a workflow.
    pub input: String,
    pub status: TaskStatus,
    pub progress: Option<String>,
    /// Set if and only if `status == Completed`.
    pub result_id: Option<ResultId>,
    /// Unique within one workflow; assigned at creation and never mutated.
    pub step_number: u32,
    /// Predecessor in the same workflow, if any.
    pub depends_on: Option<TaskId>,
}

impl Task {
    /// Create a new queued task with a fresh identifier.
    pub fn new_queued(
        workflow_id: WorkflowId,
        client_id: impl Into<String>,
        task_type: impl Into<String>,
        input: impl Into<String>,
        step_number: u32,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            workflow_id,
            client_id: client_id.into(),
            task_type: task_type.into(),
            input: input.into(),
            status: TaskStatus::Queued,
            progress: None,
            result_id: None,
            step_number,
            depends_on: None,
        }
    }
}

/// The aggregate root: a set of tasks with a derived status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub workflow_id: WorkflowId,
    pub client_id: String,
    pub status: WorkflowStatus,
    /// Serialized final report; present only once the workflow completed.
    pub final_result: Option<String>,
    /// Tasks ordered by step number. Empty when loaded without relations.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Workflow {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            workflow_id: Uuid::new_v4(),
            client_id: client_id.into(),
            status: WorkflowStatus::Initial,
            final_result: None,
            tasks: Vec::new(),
        }
    }

    pub fn completed_task_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count()
    }
}

/// Captured output of one completed task. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub result_id: ResultId,
    pub task_id: TaskId,
    /// Serialized job output, opaque to the engine.
    pub data: String,
}

impl TaskResult {
    pub fn new(task_id: TaskId, data: impl Into<String>) -> Self {
        Self {
            result_id: Uuid::new_v4(),
            task_id,
            data: data.into(),
        }
    }
}
