// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::dag::Scheduler;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::model::Task;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Ticks the scheduler on a fixed interval, feeds the results and executor
/// events into `CoreRuntime`, and delegates execution to an
/// `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    scheduler: Scheduler,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        scheduler: Scheduler,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
    ) -> Self {
        Self {
            core,
            scheduler,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Ticks the scheduler every `poll_interval`; missed ticks are skipped
    ///   rather than bunched up behind a slow store.
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Executes commands returned by the core (dispatch tasks, exit).
    ///
    /// A tick that fails to read the store is logged and retried on the next
    /// tick.
    pub async fn run(mut self) -> Result<()> {
        let poll_interval = self.core.options().poll_interval;
        info!(?poll_interval, "stepwise runtime started");

        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let event = tokio::select! {
                _ = ticker.tick() => match self.scheduler.select_ready().await {
                    Ok(ready) => RuntimeEvent::TickCompleted { ready },
                    Err(err) => {
                        warn!(error = %err, "scheduler tick failed; retrying on next tick");
                        continue;
                    }
                },
                received = self.event_rx.recv() => match received {
                    Some(event) => event,
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
            };

            debug!(?event, "runtime received event");

            // Feed the event into the pure core and get commands back.
            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!(in_flight = self.core.in_flight(), "runtime exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.dispatch(tasks).await?,
            CoreCommand::RequestExit => info!("nothing runnable and nothing in flight"),
        }
        Ok(())
    }

    async fn dispatch(&mut self, tasks: Vec<Task>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let task_ids: Vec<_> = tasks.iter().map(|t| t.task_id.to_string()).collect();
        debug!(?task_ids, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
