// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production executor in [`executor_loop`](super::executor_loop).

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::model::Task;

use super::executor_loop::spawn_executor;
use super::task_runner::TaskRunner;

/// Trait abstracting how dispatched tasks are executed.
///
/// Implementations must eventually send one `RuntimeEvent::TaskFinished`
/// per dispatched task, or the runtime will consider it in flight forever.
pub trait ExecutorBackend: Send {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<Task>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
///
/// Forwards tasks to the background loop started by [`spawn_executor`].
pub struct RealExecutorBackend {
    tx: mpsc::UnboundedSender<Task>,
}

impl RealExecutorBackend {
    /// Spawns the background executor loop immediately.
    pub fn new(
        runner: TaskRunner,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        max_concurrent_tasks: usize,
    ) -> Self {
        let tx = spawn_executor(runner, runtime_tx, max_concurrent_tasks);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<Task>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Queue everything before returning: the runtime loop must not wait
        // for a worker to free up.
        let queued: Result<()> = tasks
            .into_iter()
            .try_for_each(|task| self.tx.send(task))
            .map_err(|err| Error::msg(format!("executor loop stopped: {err}")).into());

        Box::pin(std::future::ready(queued))
    }
}
