// src/dag/scheduler.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::eligibility::{Eligibility, eligibility};
use crate::dag::scheduler_step::SchedulerStep;
use crate::errors::Result;
use crate::model::Task;
use crate::store::Store;
use crate::types::{TaskId, TaskStatus};

/// Selects the queued tasks whose dependency is satisfied.
///
/// The scheduler only reads the store. Claiming and running the selected
/// tasks is the executor's job, so selecting a task twice is harmless.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn Store>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Queued tasks that may run now (production API).
    pub async fn select_ready(&self) -> Result<Vec<Task>> {
        Ok(self.step().await?.ready)
    }

    /// Evaluate every queued task once and report what was found.
    pub async fn step(&self) -> Result<SchedulerStep> {
        let queued = self.store.find_tasks_by_status(TaskStatus::Queued).await?;
        if queued.is_empty() {
            return Ok(SchedulerStep::default());
        }
        debug!(count = queued.len(), "found queued tasks");

        let mut step = SchedulerStep::default();
        // Predecessors looked up during this tick.
        let mut lookups: HashMap<TaskId, Option<Task>> = HashMap::new();

        for task in queued {
            let dependency = match task.depends_on {
                Some(dep_id) => {
                    if !lookups.contains_key(&dep_id) {
                        let found = self.store.find_task(dep_id).await?;
                        lookups.insert(dep_id, found);
                    }
                    lookups.get(&dep_id).and_then(|t| t.as_ref())
                }
                None => None,
            };

            match eligibility(&task, dependency) {
                Eligibility::Ready => {
                    if let Some(dep_id) = task.depends_on {
                        debug!(
                            task_id = %task.task_id,
                            dependency = %dep_id,
                            "dependency satisfied"
                        );
                    }
                    step.ready.push(task);
                }
                Eligibility::Waiting { dependency, status } => {
                    debug!(
                        task_id = %task.task_id,
                        dependency = %dependency,
                        dependency_status = %status,
                        "dependency not completed yet; skipping"
                    );
                    step.waiting += 1;
                }
                Eligibility::DanglingDependency { dependency } => {
                    warn!(
                        task_id = %task.task_id,
                        dependency = %dependency,
                        "task depends on a task that does not exist; skipping"
                    );
                    step.dangling += 1;
                }
            }
        }

        if !step.ready.is_empty() {
            info!(
                ready = step.ready.len(),
                waiting = step.waiting,
                dangling = step.dangling,
                "scheduler tick selected tasks"
            );
        }

        Ok(step)
    }
}
