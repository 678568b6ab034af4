use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use stepwise::dag::Scheduler;
use stepwise::model::{Task, TaskResult, Workflow};
use stepwise::store::{MemoryStore, Store, StoreError};
use stepwise::types::{ResultId, TaskId, TaskStatus, WorkflowId, WorkflowStatus};

/// `MemoryStore` wrapper that can inject failures and look at what a
/// scheduler would see between writes.
///
/// - After every task write (`insert_tasks`, `update_tasks`) it runs a
///   scheduler pass against the current state and records the step numbers
///   it would dispatch.
/// - `fail_result_writes` makes every later `insert_result` fail.
#[derive(Clone, Default)]
pub struct InterceptingStore {
    inner: MemoryStore,
    fail_results: Arc<AtomicBool>,
    ready_after_writes: Arc<Mutex<Vec<Vec<u32>>>>,
}

impl InterceptingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store, for direct inspection.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_result_writes(&self) {
        self.fail_results.store(true, Ordering::SeqCst);
    }

    /// Ready step numbers observed after each task write, in write order.
    pub fn ready_after_writes(&self) -> Vec<Vec<u32>> {
        self.ready_after_writes
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    async fn observe(&self) -> Result<(), StoreError> {
        let scheduler = Scheduler::new(Arc::new(self.inner.clone()));
        let ready = scheduler
            .select_ready()
            .await
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let steps = ready.iter().map(|t| t.step_number).collect();
        if let Ok(mut seen) = self.ready_after_writes.lock() {
            seen.push(steps);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for InterceptingStore {
    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        self.inner.insert_workflow(workflow).await
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.inner.insert_tasks(tasks).await?;
        self.observe().await
    }

    async fn update_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.inner.update_tasks(tasks).await?;
        self.observe().await
    }

    async fn find_task(&self, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        self.inner.find_task(task_id).await
    }

    async fn find_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        self.inner.find_tasks_by_status(status).await
    }

    async fn claim_task(&self, task_id: TaskId, progress: &str) -> Result<bool, StoreError> {
        self.inner.claim_task(task_id, progress).await
    }

    async fn finish_task(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        result_id: Option<ResultId>,
    ) -> Result<bool, StoreError> {
        self.inner.finish_task(task_id, status, result_id).await
    }

    async fn insert_result(&self, result: &TaskResult) -> Result<(), StoreError> {
        if self.fail_results.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt(format!(
                "result write rejected for task {}",
                result.task_id
            )));
        }
        self.inner.insert_result(result).await
    }

    async fn find_result(&self, result_id: ResultId) -> Result<Option<TaskResult>, StoreError> {
        self.inner.find_result(result_id).await
    }

    async fn find_workflow(&self, workflow_id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        self.inner.find_workflow(workflow_id).await
    }

    async fn update_workflow_status(
        &self,
        workflow_id: WorkflowId,
        status: WorkflowStatus,
    ) -> Result<(), StoreError> {
        self.inner.update_workflow_status(workflow_id, status).await
    }

    async fn set_final_result(
        &self,
        workflow_id: WorkflowId,
        report: &str,
    ) -> Result<bool, StoreError> {
        self.inner.set_final_result(workflow_id, report).await
    }
}
