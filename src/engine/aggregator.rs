// src/engine/aggregator.rs

//! Workflow status derivation and the final report.
//!
//! The status is recomputed from the full task set on every call rather than
//! tracked incrementally, so running the aggregator again on an unchanged
//! snapshot changes nothing. The final report is written with a conditional
//! store write and is therefore produced at most once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::Result;
use crate::model::{Task, Workflow};
use crate::store::{Store, StoreError};
use crate::types::{TaskId, TaskStatus, WorkflowId, WorkflowStatus};

/// Derive a workflow status from its tasks.
///
/// Any failed task makes the workflow failed; otherwise it is completed once
/// every task completed, and in progress before that.
pub fn derive_workflow_status(tasks: &[Task]) -> WorkflowStatus {
    if tasks.iter().any(|t| t.status == TaskStatus::Failed) {
        WorkflowStatus::Failed
    } else if tasks.iter().all(|t| t.status == TaskStatus::Completed) {
        WorkflowStatus::Completed
    } else {
        WorkflowStatus::InProgress
    }
}

/// Decode a stored payload as JSON, falling back to the raw string.
pub fn parse_payload(data: &str) -> Value {
    serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_string()))
}

/// One task's entry in the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub task_id: TaskId,
    pub task_type: String,
    pub step_number: u32,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The final report stored on a completed workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReport {
    pub workflow_id: WorkflowId,
    pub status: WorkflowStatus,
    pub tasks: Vec<TaskReport>,
}

pub(crate) const MISSING_RESULT: &str = "Result data not found";
pub(crate) const TASK_FAILED: &str = "Task failed during execution";

/// Build the report for `workflow`, loading task results from `store`.
///
/// Tasks are listed by step number regardless of completion order. A
/// completed task whose result cannot be found gets an explicit error
/// instead of an output.
pub async fn build_report(store: &dyn Store, workflow: &Workflow) -> Result<WorkflowReport> {
    let mut tasks: Vec<&Task> = workflow.tasks.iter().collect();
    tasks.sort_by_key(|t| t.step_number);

    let mut entries = Vec::with_capacity(tasks.len());
    for task in tasks {
        let mut entry = TaskReport {
            task_id: task.task_id,
            task_type: task.task_type.clone(),
            step_number: task.step_number,
            status: task.status,
            output: None,
            error: None,
        };

        match task.status {
            TaskStatus::Completed => {
                let result = match task.result_id {
                    Some(id) => store.find_result(id).await?,
                    None => None,
                };
                match result {
                    Some(result) => entry.output = Some(parse_payload(&result.data)),
                    None => {
                        entry.output = Some(Value::Null);
                        entry.error = Some(MISSING_RESULT.to_string());
                    }
                }
            }
            TaskStatus::Failed => entry.error = Some(TASK_FAILED.to_string()),
            TaskStatus::Queued | TaskStatus::InProgress => {}
        }

        entries.push(entry);
    }

    Ok(WorkflowReport {
        workflow_id: workflow.workflow_id,
        status: derive_workflow_status(&workflow.tasks),
        tasks: entries,
    })
}

/// Recomputes workflow status after task transitions and writes the final
/// report on completion.
///
/// Clones share one lock: aggregations run one at a time, so a stale task
/// snapshot never overwrites a status derived from a newer one.
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn Store>,
    serial: Arc<Mutex<()>>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            serial: Arc::new(Mutex::new(())),
        }
    }

    /// Recompute the status of `workflow_id` and persist it if it changed.
    ///
    /// The first call that observes a completed workflow also stores the
    /// final report; later calls leave an existing report untouched.
    pub async fn aggregate(&self, workflow_id: WorkflowId) -> Result<WorkflowStatus> {
        let _serial = self.serial.lock().await;

        let workflow = self
            .store
            .find_workflow(workflow_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("workflow {workflow_id}")))?;

        let status = derive_workflow_status(&workflow.tasks);
        if status != workflow.status {
            self.store.update_workflow_status(workflow_id, status).await?;
            info!(
                workflow_id = %workflow_id,
                from = %workflow.status,
                to = %status,
                "workflow status changed"
            );
        }

        if status == WorkflowStatus::Completed && workflow.final_result.is_none() {
            info!(workflow_id = %workflow_id, "workflow completed; aggregating final results");
            let report = build_report(self.store.as_ref(), &workflow).await?;
            let serialized = serde_json::to_string_pretty(&report)?;

            if self.store.set_final_result(workflow_id, &serialized).await? {
                info!(workflow_id = %workflow_id, "final results stored");
            } else {
                debug!(workflow_id = %workflow_id, "final results already stored");
            }
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskResult;
    use crate::store::MemoryStore;

    fn task_with(status: TaskStatus, step: u32) -> Task {
        let mut task = Task::new_queued(uuid::Uuid::nil(), "c", "t", "{}", step);
        task.status = status;
        task
    }

    #[test]
    fn any_failure_wins_over_completion() {
        let tasks = vec![
            task_with(TaskStatus::Completed, 1),
            task_with(TaskStatus::Failed, 2),
            task_with(TaskStatus::Queued, 3),
        ];
        assert_eq!(derive_workflow_status(&tasks), WorkflowStatus::Failed);
    }

    #[test]
    fn partially_done_workflow_is_in_progress() {
        let tasks = vec![
            task_with(TaskStatus::Completed, 1),
            task_with(TaskStatus::Queued, 2),
        ];
        assert_eq!(derive_workflow_status(&tasks), WorkflowStatus::InProgress);
    }

    #[test]
    fn payload_that_is_not_json_is_kept_raw() {
        assert_eq!(parse_payload("not json"), Value::String("not json".to_string()));
        assert_eq!(parse_payload(r#"{"a":1}"#)["a"], 1);
    }

    #[tokio::test]
    async fn report_lists_tasks_by_step_and_flags_missing_results() {
        let store = MemoryStore::new();
        let mut workflow = Workflow::new("c");

        let mut second = task_with(TaskStatus::Completed, 2);
        second.workflow_id = workflow.workflow_id;
        let result = TaskResult::new(second.task_id, r#"{"ok":true}"#);
        store.insert_result(&result).await.unwrap();
        second.result_id = Some(result.result_id);

        let mut first = task_with(TaskStatus::Completed, 1);
        first.workflow_id = workflow.workflow_id;
        first.result_id = None;

        workflow.tasks = vec![second, first];

        let report = build_report(&store, &workflow).await.unwrap();
        assert_eq!(report.status, WorkflowStatus::Completed);
        assert_eq!(report.tasks[0].step_number, 1);
        assert_eq!(report.tasks[0].error.as_deref(), Some(MISSING_RESULT));
        assert_eq!(report.tasks[1].output, Some(serde_json::json!({"ok": true})));
        assert_eq!(report.tasks[1].error, None);
    }
}
