// src/store/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{Store, StoreError};
use crate::model::{Task, TaskResult, Workflow};
use crate::types::{ResultId, TaskId, TaskStatus, WorkflowId, WorkflowStatus};

#[derive(Debug, Default)]
struct MemoryState {
    workflows: HashMap<WorkflowId, Workflow>,
    tasks: HashMap<TaskId, Task>,
    results: HashMap<ResultId, TaskResult>,
}

/// In-process store. Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sort_by_step(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.workflow_id
            .cmp(&b.workflow_id)
            .then(a.step_number.cmp(&b.step_number))
    });
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut record = workflow.clone();
        record.tasks.clear();
        self.lock().workflows.insert(record.workflow_id, record);
        Ok(())
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut state = self.lock();
        for task in tasks {
            if !state.workflows.contains_key(&task.workflow_id) {
                return Err(StoreError::NotFound(format!("workflow {}", task.workflow_id)));
            }
        }
        for task in tasks {
            state.tasks.insert(task.task_id, task.clone());
        }
        Ok(())
    }

    async fn update_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut state = self.lock();
        for task in tasks {
            if !state.tasks.contains_key(&task.task_id) {
                return Err(StoreError::NotFound(format!("task {}", task.task_id)));
            }
        }
        for task in tasks {
            state.tasks.insert(task.task_id, task.clone());
        }
        Ok(())
    }

    async fn find_task(&self, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.lock().tasks.get(&task_id).cloned())
    }

    async fn find_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .lock()
            .tasks
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        sort_by_step(&mut tasks);
        Ok(tasks)
    }

    async fn claim_task(&self, task_id: TaskId, progress: &str) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state.tasks.get_mut(&task_id) {
            Some(task) if task.status == TaskStatus::Queued => {
                task.status = TaskStatus::InProgress;
                task.progress = Some(progress.to_string());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!("task {task_id}"))),
        }
    }

    async fn finish_task(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        result_id: Option<ResultId>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state.tasks.get_mut(&task_id) {
            Some(task) if task.status == TaskStatus::InProgress && status.is_terminal() => {
                task.status = status;
                task.progress = None;
                task.result_id = result_id;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!("task {task_id}"))),
        }
    }

    async fn insert_result(&self, result: &TaskResult) -> Result<(), StoreError> {
        self.lock().results.insert(result.result_id, result.clone());
        Ok(())
    }

    async fn find_result(&self, result_id: ResultId) -> Result<Option<TaskResult>, StoreError> {
        Ok(self.lock().results.get(&result_id).cloned())
    }

    async fn find_workflow(&self, workflow_id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        let state = self.lock();
        let Some(workflow) = state.workflows.get(&workflow_id) else {
            return Ok(None);
        };

        let mut workflow = workflow.clone();
        workflow.tasks = state
            .tasks
            .values()
            .filter(|t| t.workflow_id == workflow_id)
            .cloned()
            .collect();
        sort_by_step(&mut workflow.tasks);
        Ok(Some(workflow))
    }

    async fn update_workflow_status(
        &self,
        workflow_id: WorkflowId,
        status: WorkflowStatus,
    ) -> Result<(), StoreError> {
        match self.lock().workflows.get_mut(&workflow_id) {
            Some(workflow) => {
                workflow.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("workflow {workflow_id}"))),
        }
    }

    async fn set_final_result(
        &self,
        workflow_id: WorkflowId,
        report: &str,
    ) -> Result<bool, StoreError> {
        match self.lock().workflows.get_mut(&workflow_id) {
            Some(workflow) if workflow.final_result.is_none() => {
                workflow.final_result = Some(report.to_string());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!("workflow {workflow_id}"))),
        }
    }
}
