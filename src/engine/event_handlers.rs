// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashSet;

use tracing::debug;

use crate::engine::{RuntimeOptions, TaskOutcome};
use crate::model::Task;
use crate::types::TaskId;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<Task>),
    /// Request that the process exits (used for `--until-idle`).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn keep_running() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

/// Handle the tasks selected by a scheduler tick.
///
/// Tasks already dispatched and not yet finished are dropped, so a slow job
/// is never handed out twice by this process. In `--until-idle` mode a tick
/// that selects nothing while nothing is in flight ends the runtime.
pub fn handle_tick(
    in_flight: &mut HashSet<TaskId>,
    options: &RuntimeOptions,
    ready: Vec<Task>,
) -> CoreStep {
    let fresh: Vec<Task> = ready
        .into_iter()
        .filter(|t| {
            let inserted = in_flight.insert(t.task_id);
            if !inserted {
                debug!(task_id = %t.task_id, "task still in flight; not dispatching again");
            }
            inserted
        })
        .collect();

    if !fresh.is_empty() {
        return CoreStep {
            commands: vec![CoreCommand::DispatchTasks(fresh)],
            keep_running: true,
        };
    }

    if options.exit_when_idle && in_flight.is_empty() {
        return CoreStep {
            commands: vec![CoreCommand::RequestExit],
            keep_running: false,
        };
    }

    CoreStep::keep_running()
}

/// Handle a finished task.
pub fn handle_task_finished(
    in_flight: &mut HashSet<TaskId>,
    task_id: TaskId,
    outcome: TaskOutcome,
) -> CoreStep {
    if !in_flight.remove(&task_id) {
        debug!(task_id = %task_id, ?outcome, "finish event for a task that was not in flight");
    }
    CoreStep::keep_running()
}
