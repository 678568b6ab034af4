// src/jobs/report_generation.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::Job;
use crate::engine::aggregator::{TASK_FAILED, parse_payload};
use crate::model::Task;
use crate::store::Store;
use crate::types::{TaskId, TaskStatus, WorkflowId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InterimTaskEntry {
    task_id: TaskId,
    #[serde(rename = "type")]
    task_type: String,
    output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InterimReport {
    workflow_id: WorkflowId,
    tasks: Vec<InterimTaskEntry>,
    final_report: &'static str,
    total_tasks: usize,
    completed_tasks: usize,
    failed_tasks: usize,
}

/// Reports on every other task of the workflow as it stands when this job
/// runs. Usually declared as the last step, depending on the step before it.
pub struct ReportGenerationJob {
    store: Arc<dyn Store>,
}

impl ReportGenerationJob {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn entry_for(&self, task: &Task) -> Result<InterimTaskEntry> {
        let mut entry = InterimTaskEntry {
            task_id: task.task_id,
            task_type: task.task_type.clone(),
            output: None,
            status: None,
            error: None,
            message: None,
        };

        match (task.status, task.result_id) {
            (TaskStatus::Completed, Some(result_id)) => {
                match self.store.find_result(result_id).await? {
                    Some(result) => entry.output = Some(parse_payload(&result.data)),
                    None => {
                        entry.error = Some(
                            "Result not found or data is null despite task being marked as completed"
                                .to_string(),
                        )
                    }
                }
            }
            (TaskStatus::Failed, _) => {
                entry.status = Some(task.status);
                entry.error = Some(TASK_FAILED.to_string());
            }
            (status, _) => {
                entry.status = Some(status);
                entry.message = Some(format!("Task is in {status} state"));
            }
        }

        Ok(entry)
    }
}

#[async_trait]
impl Job for ReportGenerationJob {
    async fn run(&self, task: &Task) -> Result<Value> {
        info!(task_id = %task.task_id, "running report generation");

        let workflow = self
            .store
            .find_workflow(task.workflow_id)
            .await?
            .with_context(|| format!("Workflow with ID {} not found", task.workflow_id))?;

        let mut entries = Vec::with_capacity(workflow.tasks.len());
        for other in workflow.tasks.iter().filter(|t| t.task_id != task.task_id) {
            entries.push(self.entry_for(other).await?);
        }

        let completed_tasks = entries
            .iter()
            .filter(|e| e.error.is_none() && e.output.is_some())
            .count();
        let failed_tasks = entries
            .iter()
            .filter(|e| e.error.is_some() || e.status == Some(TaskStatus::Failed))
            .count();

        let report = InterimReport {
            workflow_id: workflow.workflow_id,
            final_report: "Aggregated data and results from all workflow tasks",
            total_tasks: entries.len(),
            completed_tasks,
            failed_tasks,
            tasks: entries,
        };

        info!(workflow_id = %workflow.workflow_id, "report generation completed");
        Ok(serde_json::to_value(report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskResult, Workflow};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn summarises_the_other_tasks_in_step_order() {
        let store = Arc::new(MemoryStore::new());
        let workflow = Workflow::new("client-1");
        store.insert_workflow(&workflow).await.unwrap();

        let done = Task::new_queued(workflow.workflow_id, "client-1", "polygonArea", "{}", 1);
        let broken = Task::new_queued(workflow.workflow_id, "client-1", "notification", "{}", 2);
        let waiting = Task::new_queued(workflow.workflow_id, "client-1", "notification", "{}", 3);
        let report = Task::new_queued(workflow.workflow_id, "client-1", "reportGeneration", "{}", 4);
        store
            .insert_tasks(&[done.clone(), broken.clone(), waiting.clone(), report.clone()])
            .await
            .unwrap();

        let result = TaskResult::new(done.task_id, r#"{"area":1.5}"#);
        store.insert_result(&result).await.unwrap();
        store.claim_task(done.task_id, "starting job...").await.unwrap();
        store
            .finish_task(done.task_id, TaskStatus::Completed, Some(result.result_id))
            .await
            .unwrap();
        store.claim_task(broken.task_id, "starting job...").await.unwrap();
        store.finish_task(broken.task_id, TaskStatus::Failed, None).await.unwrap();

        let job = ReportGenerationJob::new(store.clone());
        let output = job.run(&report).await.unwrap();

        assert_eq!(output["workflowId"], workflow.workflow_id.to_string());
        assert_eq!(output["totalTasks"], 3);
        assert_eq!(output["completedTasks"], 1);
        assert_eq!(output["failedTasks"], 1);

        let tasks = output["tasks"].as_array().unwrap();
        assert_eq!(tasks[0]["type"], "polygonArea");
        assert_eq!(tasks[0]["output"]["area"], 1.5);
        assert_eq!(tasks[1]["error"], "Task failed during execution");
        assert_eq!(tasks[1]["status"], "failed");
        assert_eq!(tasks[2]["message"], "Task is in queued state");
    }

    #[tokio::test]
    async fn missing_workflow_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let orphan = Task::new_queued(uuid::Uuid::new_v4(), "c", "reportGeneration", "{}", 1);
        let job = ReportGenerationJob::new(store);
        assert!(job.run(&orphan).await.is_err());
    }
}
