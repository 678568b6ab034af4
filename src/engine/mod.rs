// src/engine/mod.rs

//! Orchestration engine for stepwise.
//!
//! This module ties together:
//! - the workflow aggregator (status derivation and the final report)
//! - the main runtime event loop that reacts to:
//!   - scheduler ticks
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::errors::Result;
use crate::exec::ExecutionOutcome;
use crate::model::Task;
use crate::types::TaskId;

/// How a dispatched task ended, as far as the runtime is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed,
    /// Another runner had already claimed the task.
    Skipped,
    /// Execution stopped on a store or configuration error.
    Errored,
}

impl From<&Result<ExecutionOutcome>> for TaskOutcome {
    fn from(result: &Result<ExecutionOutcome>) -> Self {
        match result {
            Ok(ExecutionOutcome::Completed(_)) => TaskOutcome::Completed,
            Ok(ExecutionOutcome::Failed) => TaskOutcome::Failed,
            Ok(ExecutionOutcome::Skipped) => TaskOutcome::Skipped,
            Err(_) => TaskOutcome::Errored,
        }
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Time between scheduler ticks.
    pub poll_interval: Duration,
    /// If true, exit once a tick finds nothing runnable and nothing is in
    /// flight (used for `run --until-idle`).
    pub exit_when_idle: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            exit_when_idle: false,
        }
    }
}

/// Events flowing into the runtime from the ticker, executors, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A scheduler tick selected these tasks as runnable.
    TickCompleted { ready: Vec<Task> },
    /// A dispatched task finished executing.
    TaskFinished { task_id: TaskId, outcome: TaskOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod aggregator;
pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use aggregator::{Aggregator, TaskReport, WorkflowReport, build_report, derive_workflow_status};
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
