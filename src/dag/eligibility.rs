// src/dag/eligibility.rs

use crate::model::Task;
use crate::types::{TaskId, TaskStatus};

/// Whether a queued task may be handed to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Ready,
    /// The predecessor exists but has not completed yet.
    Waiting {
        dependency: TaskId,
        status: TaskStatus,
    },
    /// The predecessor cannot be found. The task stays queued forever.
    DanglingDependency { dependency: TaskId },
}

impl Eligibility {
    pub fn is_ready(&self) -> bool {
        matches!(self, Eligibility::Ready)
    }
}

/// Decide eligibility of `task` given its looked-up predecessor.
///
/// `dependency` must be the task named by `task.depends_on`, or `None` if
/// that lookup found nothing. It is ignored for tasks without a dependency.
pub fn eligibility(task: &Task, dependency: Option<&Task>) -> Eligibility {
    let Some(dep_id) = task.depends_on else {
        return Eligibility::Ready;
    };

    match dependency {
        None => Eligibility::DanglingDependency { dependency: dep_id },
        Some(dep) if dep.status == TaskStatus::Completed => Eligibility::Ready,
        Some(dep) => Eligibility::Waiting {
            dependency: dep_id,
            status: dep.status,
        },
    }
}
