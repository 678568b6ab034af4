// src/query.rs

//! Read-side queries behind `GET /workflow/{id}/status` and
//! `GET /workflow/{id}/results`.
//!
//! Errors carry the HTTP status code and JSON body an HTTP layer should
//! answer with, so a server only needs to forward them.

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

use crate::engine::aggregator::parse_payload;
use crate::store::{Store, StoreError};
use crate::types::{WorkflowId, WorkflowStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub workflow_id: WorkflowId,
    pub status: WorkflowStatus,
    pub completed_tasks: usize,
    pub total_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    pub workflow_id: WorkflowId,
    pub status: WorkflowStatus,
    /// The stored report, parsed; the raw string if it is not valid JSON.
    pub final_result: Value,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Workflow with ID {0} not found.")]
    NotFound(WorkflowId),

    #[error("Workflow {workflow_id} is not yet completed. Current status: {status}.")]
    NotCompleted {
        workflow_id: WorkflowId,
        status: WorkflowStatus,
    },

    #[error("Internal Server Error")]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::NotFound(_) => 404,
            QueryError::NotCompleted { .. } => 400,
            QueryError::Store(_) => 500,
        }
    }

    /// JSON body to send with [`status_code`](Self::status_code).
    pub fn body(&self) -> Value {
        match self {
            QueryError::NotFound(_) => json!({ "message": self.to_string() }),
            QueryError::NotCompleted {
                workflow_id,
                status,
            } => json!({
                "message": self.to_string(),
                "workflowId": workflow_id,
                "status": status,
            }),
            QueryError::Store(err) => json!({
                "message": self.to_string(),
                "error": err.to_string(),
            }),
        }
    }
}

/// Current status and task counts of a workflow.
pub async fn workflow_status(
    store: &dyn Store,
    workflow_id: WorkflowId,
) -> Result<StatusResponse, QueryError> {
    let workflow = store
        .find_workflow(workflow_id)
        .await
        .inspect_err(|err| {
            error!(workflow_id = %workflow_id, error = %err, "error fetching workflow status")
        })?
        .ok_or(QueryError::NotFound(workflow_id))?;

    Ok(StatusResponse {
        workflow_id: workflow.workflow_id,
        status: workflow.status,
        completed_tasks: workflow.completed_task_count(),
        total_tasks: workflow.tasks.len(),
    })
}

/// Final report of a completed workflow.
///
/// Workflows in any other status answer with
/// [`QueryError::NotCompleted`], echoing the current status.
pub async fn workflow_results(
    store: &dyn Store,
    workflow_id: WorkflowId,
) -> Result<ResultsResponse, QueryError> {
    let workflow = store
        .find_workflow(workflow_id)
        .await
        .inspect_err(|err| {
            error!(workflow_id = %workflow_id, error = %err, "error fetching workflow results")
        })?
        .ok_or(QueryError::NotFound(workflow_id))?;

    if workflow.status != WorkflowStatus::Completed {
        return Err(QueryError::NotCompleted {
            workflow_id,
            status: workflow.status,
        });
    }

    let final_result = workflow
        .final_result
        .as_deref()
        .map(parse_payload)
        .unwrap_or(Value::Null);

    Ok(ResultsResponse {
        workflow_id: workflow.workflow_id,
        status: workflow.status,
        final_result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, Workflow};
    use crate::store::MemoryStore;
    use uuid::Uuid;

    async fn seeded(status: WorkflowStatus, report: Option<&str>) -> (MemoryStore, WorkflowId) {
        let store = MemoryStore::new();
        let workflow = Workflow::new("c");
        store.insert_workflow(&workflow).await.unwrap();
        let task = Task::new_queued(workflow.workflow_id, "c", "t", "{}", 1);
        store.insert_tasks(&[task]).await.unwrap();
        store
            .update_workflow_status(workflow.workflow_id, status)
            .await
            .unwrap();
        if let Some(report) = report {
            store.set_final_result(workflow.workflow_id, report).await.unwrap();
        }
        (store, workflow.workflow_id)
    }

    #[tokio::test]
    async fn status_counts_tasks() {
        let (store, id) = seeded(WorkflowStatus::InProgress, None).await;
        let response = workflow_status(&store, id).await.unwrap();
        assert_eq!(response.status, WorkflowStatus::InProgress);
        assert_eq!(response.completed_tasks, 0);
        assert_eq!(response.total_tasks, 1);
    }

    #[tokio::test]
    async fn unknown_workflow_is_404() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let err = workflow_status(&store, id).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(
            err.body()["message"],
            format!("Workflow with ID {id} not found.")
        );
    }

    #[tokio::test]
    async fn results_of_unfinished_workflow_are_400_with_status() {
        let (store, id) = seeded(WorkflowStatus::InProgress, None).await;
        let err = workflow_results(&store, id).await.unwrap_err();

        assert_eq!(err.status_code(), 400);
        let body = err.body();
        assert_eq!(body["status"], "in_progress");
        assert_eq!(body["workflowId"], id.to_string());
        assert_eq!(
            body["message"],
            format!("Workflow {id} is not yet completed. Current status: in_progress.")
        );
    }

    #[tokio::test]
    async fn results_parse_the_stored_report() {
        let (store, id) = seeded(WorkflowStatus::Completed, Some(r#"{"tasks":[]}"#)).await;
        let response = workflow_results(&store, id).await.unwrap();
        assert_eq!(response.final_result, json!({ "tasks": [] }));

        let (store, id) = seeded(WorkflowStatus::Completed, Some("plain text")).await;
        let response = workflow_results(&store, id).await.unwrap();
        assert_eq!(response.final_result, json!("plain text"));
    }

    #[test]
    fn store_failure_is_500() {
        let err = QueryError::from(StoreError::Corrupt("bad row".to_string()));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.body()["message"], "Internal Server Error");
        assert_eq!(err.body()["error"], "corrupt record: bad row");
    }
}
