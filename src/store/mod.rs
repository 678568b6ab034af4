// src/store/mod.rs

//! Persistence boundary for workflows, tasks and results.
//!
//! The engine only talks to the [`Store`] trait. Two implementations ship:
//! - [`MemoryStore`]: process-local maps, used by tests and embedders.
//! - [`SqliteStore`]: `sqlx` SQLite pool, shared between processes.
//!
//! State transitions that can race between scheduler ticks or scheduler
//! instances are conditional writes on the store side (`claim_task`,
//! `finish_task`, `set_final_result`). Callers learn from the returned `bool`
//! whether their write won.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Task, TaskResult, Workflow};
use crate::types::{ResultId, TaskId, TaskStatus, WorkflowId, WorkflowStatus};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the schema failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be decoded into an entity.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Repository operations the engine depends on.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a new workflow record (without its tasks).
    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError>;

    /// Persist a batch of new tasks.
    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError>;

    /// Save a batch of existing tasks (full overwrite of mutable fields).
    async fn update_tasks(&self, tasks: &[Task]) -> Result<(), StoreError>;

    async fn find_task(&self, task_id: TaskId) -> Result<Option<Task>, StoreError>;

    /// All tasks in `status`, ordered by workflow and then step number.
    async fn find_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError>;

    /// Atomically transition a task `Queued -> InProgress` and set its
    /// progress marker.
    ///
    /// Returns `false` (and changes nothing) if the task is not currently
    /// queued, i.e. someone else already claimed it.
    async fn claim_task(&self, task_id: TaskId, progress: &str) -> Result<bool, StoreError>;

    /// Atomically transition a task `InProgress -> status`, clear its progress
    /// and record `result_id`.
    ///
    /// Returns `false` if the task was not in progress.
    async fn finish_task(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        result_id: Option<ResultId>,
    ) -> Result<bool, StoreError>;

    async fn insert_result(&self, result: &TaskResult) -> Result<(), StoreError>;

    async fn find_result(&self, result_id: ResultId) -> Result<Option<TaskResult>, StoreError>;

    /// Find a workflow together with its tasks, ordered by step number.
    async fn find_workflow(&self, workflow_id: WorkflowId) -> Result<Option<Workflow>, StoreError>;

    async fn update_workflow_status(
        &self,
        workflow_id: WorkflowId,
        status: WorkflowStatus,
    ) -> Result<(), StoreError>;

    /// Store the final report unless one is already present.
    ///
    /// Returns `true` if this call wrote the report.
    async fn set_final_result(
        &self,
        workflow_id: WorkflowId,
        report: &str,
    ) -> Result<bool, StoreError>;
}
