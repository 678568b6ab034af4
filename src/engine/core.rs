// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state (the set of in-flight tasks)
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - ticking the scheduler against the store
//! - sending tasks to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels or store.

use std::collections::HashSet;

use crate::engine::event_handlers::{CoreStep, handle_task_finished, handle_tick};
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::types::TaskId;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    in_flight: HashSet<TaskId>,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(options: RuntimeOptions) -> Self {
        Self {
            in_flight: HashSet::new(),
            options,
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Whether no dispatched task is still running.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TickCompleted { ready } => {
                handle_tick(&mut self.in_flight, &self.options, ready)
            }
            RuntimeEvent::TaskFinished { task_id, outcome } => {
                handle_task_finished(&mut self.in_flight, task_id, outcome)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CoreCommand, TaskOutcome};
    use crate::model::Task;
    use uuid::Uuid;

    fn task(step: u32) -> Task {
        Task::new_queued(Uuid::nil(), "c", "t", "{}", step)
    }

    fn dispatched(step: &CoreStep) -> Vec<TaskId> {
        step.commands
            .iter()
            .flat_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => tasks.iter().map(|t| t.task_id).collect(),
                CoreCommand::RequestExit => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn in_flight_tasks_are_not_dispatched_twice() {
        let mut core = CoreRuntime::new(RuntimeOptions::default());
        let a = task(1);

        let first = core.step(RuntimeEvent::TickCompleted {
            ready: vec![a.clone()],
        });
        assert_eq!(dispatched(&first), vec![a.task_id]);

        let second = core.step(RuntimeEvent::TickCompleted {
            ready: vec![a.clone()],
        });
        assert!(dispatched(&second).is_empty());
        assert!(second.keep_running);

        core.step(RuntimeEvent::TaskFinished {
            task_id: a.task_id,
            outcome: TaskOutcome::Completed,
        });
        assert!(core.is_idle());
    }

    #[test]
    fn until_idle_exits_only_when_nothing_is_running() {
        let mut core = CoreRuntime::new(RuntimeOptions {
            exit_when_idle: true,
            ..RuntimeOptions::default()
        });
        let a = task(1);

        core.step(RuntimeEvent::TickCompleted {
            ready: vec![a.clone()],
        });
        let busy = core.step(RuntimeEvent::TickCompleted { ready: vec![] });
        assert!(busy.keep_running);

        core.step(RuntimeEvent::TaskFinished {
            task_id: a.task_id,
            outcome: TaskOutcome::Failed,
        });
        let idle = core.step(RuntimeEvent::TickCompleted { ready: vec![] });
        assert!(!idle.keep_running);
        assert!(matches!(idle.commands.as_slice(), [CoreCommand::RequestExit]));
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = CoreRuntime::new(RuntimeOptions::default());
        assert!(!core.step(RuntimeEvent::ShutdownRequested).keep_running);
    }
}
