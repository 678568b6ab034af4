// src/dag/scheduler_step.rs

use crate::model::Task;

/// What one scheduler tick found among the queued tasks.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that may run now, in step order within each workflow.
    pub ready: Vec<Task>,
    /// Tasks whose predecessor has not completed yet.
    pub waiting: usize,
    /// Tasks whose predecessor does not exist.
    pub dangling: usize,
}
