// src/exec/task_runner.rs

//! Individual task runner.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::engine::aggregator::Aggregator;
use crate::errors::Result;
use crate::jobs::JobRegistry;
use crate::model::{Task, TaskResult};
use crate::store::Store;
use crate::types::{ResultId, TaskStatus};

/// Progress marker stored while a task's job runs.
pub const STARTING_PROGRESS: &str = "starting job...";

/// How one [`TaskRunner::execute`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The job succeeded and its output was stored.
    Completed(ResultId),
    /// The job failed; the task is marked failed.
    Failed,
    /// The task was no longer queued, so another runner owns it.
    Skipped,
}

/// Runs queued tasks through their job.
#[derive(Clone)]
pub struct TaskRunner {
    store: Arc<dyn Store>,
    registry: Arc<JobRegistry>,
    aggregator: Aggregator,
}

impl TaskRunner {
    pub fn new(store: Arc<dyn Store>, registry: Arc<JobRegistry>) -> Self {
        let aggregator = Aggregator::new(store.clone());
        Self {
            store,
            registry,
            aggregator,
        }
    }

    /// Execute `task` end to end.
    ///
    /// - Claims the task (`Queued -> InProgress`) before anything runs; a lost
    ///   claim returns [`ExecutionOutcome::Skipped`] without side effects.
    /// - A failing job marks the task failed and is not an error here.
    /// - The workflow is aggregated after the task reaches a terminal state.
    ///
    /// An unregistered task type fails the claimed task and is returned as
    /// [`UnknownTaskType`](crate::errors::StepwiseError::UnknownTaskType).
    /// Store errors are returned as-is; one that hits after a successful job
    /// still fails the task so it does not stay in progress.
    pub async fn execute(&self, task: &Task) -> Result<ExecutionOutcome> {
        if !self.store.claim_task(task.task_id, STARTING_PROGRESS).await? {
            debug!(task_id = %task.task_id, "task already claimed; skipping");
            return Ok(ExecutionOutcome::Skipped);
        }

        let job = match self.registry.resolve(&task.task_type) {
            Ok(job) => job,
            Err(err) => {
                error!(
                    task_id = %task.task_id,
                    task_type = %task.task_type,
                    "no job registered for task type; failing task"
                );
                self.finish(task, TaskStatus::Failed, None).await?;
                self.aggregator.aggregate(task.workflow_id).await?;
                return Err(err);
            }
        };

        info!(
            task_id = %task.task_id,
            task_type = %task.task_type,
            step = task.step_number,
            "starting job"
        );

        let outcome = match job.run(task).await {
            Ok(output) => match self.complete(task, output).await {
                Ok(result_id) => ExecutionOutcome::Completed(result_id),
                Err(err) => {
                    error!(
                        task_id = %task.task_id,
                        task_type = %task.task_type,
                        error = %err,
                        "could not record job output; failing task"
                    );
                    self.fail_after_store_error(task).await;
                    return Err(err);
                }
            },
            Err(err) => {
                error!(
                    task_id = %task.task_id,
                    task_type = %task.task_type,
                    error = %format!("{err:#}"),
                    "job failed"
                );
                self.finish(task, TaskStatus::Failed, None).await?;
                ExecutionOutcome::Failed
            }
        };

        self.aggregator.aggregate(task.workflow_id).await?;
        Ok(outcome)
    }

    async fn complete(&self, task: &Task, output: Value) -> Result<ResultId> {
        let result_id = self.store_output(task, output).await?;
        info!(
            task_id = %task.task_id,
            task_type = %task.task_type,
            "job completed successfully"
        );
        self.finish(task, TaskStatus::Completed, Some(result_id)).await?;
        Ok(result_id)
    }

    /// Best effort: a claimed task must not stay in progress because its
    /// output could not be written.
    async fn fail_after_store_error(&self, task: &Task) {
        if let Err(err) = self.finish(task, TaskStatus::Failed, None).await {
            error!(
                task_id = %task.task_id,
                error = %err,
                "could not mark task failed; it stays in progress"
            );
            return;
        }
        if let Err(err) = self.aggregator.aggregate(task.workflow_id).await {
            warn!(workflow_id = %task.workflow_id, error = %err, "aggregation failed");
        }
    }

    async fn store_output(&self, task: &Task, output: Value) -> Result<ResultId> {
        let output = if output.is_null() {
            Value::Object(Default::default())
        } else {
            output
        };
        let result = TaskResult::new(task.task_id, serde_json::to_string(&output)?);
        self.store.insert_result(&result).await?;
        Ok(result.result_id)
    }

    async fn finish(
        &self,
        task: &Task,
        status: TaskStatus,
        result_id: Option<ResultId>,
    ) -> Result<()> {
        if !self.store.finish_task(task.task_id, status, result_id).await? {
            warn!(
                task_id = %task.task_id,
                status = %status,
                "task was no longer in progress; status not recorded"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
