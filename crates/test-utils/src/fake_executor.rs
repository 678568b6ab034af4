use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use stepwise::engine::{RuntimeEvent, TaskOutcome};
use stepwise::errors::Result;
use stepwise::exec::{ExecutorBackend, TaskRunner};
use stepwise::model::Task;
use stepwise::types::TaskId;

/// A fake executor that:
/// - records which tasks were dispatched, in order
/// - runs them inline through a `TaskRunner`, one at a time
/// - immediately reports `TaskFinished` for each dispatched task.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    runner: TaskRunner,
    executed: Arc<Mutex<Vec<TaskId>>>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        runner: TaskRunner,
        executed: Arc<Mutex<Vec<TaskId>>>,
    ) -> Self {
        Self {
            runtime_tx,
            runner,
            executed,
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<Task>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let runner = self.runner.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.task_id);
                }

                let result = runner.execute(&t).await;
                tx.send(RuntimeEvent::TaskFinished {
                    task_id: t.task_id,
                    outcome: TaskOutcome::from(&result),
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
