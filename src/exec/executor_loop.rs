// src/exec/executor_loop.rs

//! Background loop that runs dispatched tasks.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info};

use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::task_runner::TaskRunner;
use crate::model::Task;

/// Spawn the background executor loop.
///
/// The returned sender is what `RealExecutorBackend` forwards tasks to. Each
/// task runs in its own Tokio task, with at most `max_concurrent_tasks`
/// running at once; with a limit of 1 tasks run one after another in
/// dispatch order. Every task produces exactly one
/// `RuntimeEvent::TaskFinished`.
///
/// The queue is unbounded so that sending never waits on busy workers. Its
/// length is bounded by the runtime, which never dispatches a task that is
/// still in flight.
pub fn spawn_executor(
    runner: TaskRunner,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    max_concurrent_tasks: usize,
) -> mpsc::UnboundedSender<Task> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
    let permits = Arc::new(Semaphore::new(max_concurrent_tasks.max(1)));

    tokio::spawn(async move {
        info!(max_concurrent_tasks, "executor loop started");

        while let Some(task) = rx.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };

            let runner = runner.clone();
            let rt_tx = runtime_tx.clone();
            tokio::spawn(async move {
                let result = runner.execute(&task).await;
                drop(permit);

                match &result {
                    Err(err) if err.is_configuration() => error!(
                        task_id = %task.task_id,
                        task_type = %task.task_type,
                        error = %err,
                        "task rejected by configuration"
                    ),
                    Err(err) => error!(
                        task_id = %task.task_id,
                        task_type = %task.task_type,
                        error = %err,
                        "task execution error; queued work is retried on the next tick"
                    ),
                    Ok(_) => {}
                }

                let outcome = TaskOutcome::from(&result);
                if rt_tx
                    .send(RuntimeEvent::TaskFinished {
                        task_id: task.task_id,
                        outcome,
                    })
                    .await
                    .is_err()
                {
                    debug!(task_id = %task.task_id, "runtime gone; dropping finish event");
                }
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
