// tests/runtime_real_executor.rs

mod common;
use crate::common::builders::{DefinitionBuilder, three_step_chain};
use crate::common::{SQUARE_FEATURE, init_tracing, memory_stack, with_timeout};

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep};

use stepwise::dag::Scheduler;
use stepwise::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use stepwise::exec::{RealExecutorBackend, TaskRunner};
use stepwise::jobs::{Job, JobRegistry};
use stepwise::model::Task;
use stepwise::store::{MemoryStore, Store};
use stepwise::types::{TaskStatus, WorkflowStatus};
use stepwise::workflow::WorkflowFactory;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn concurrent_executor_completes_independent_workflows() -> TestResult {
    init_tracing();

    let (_store, shared, registry) = memory_stack();
    let factory = WorkflowFactory::new(shared.clone(), Some(registry.clone()));

    let chained = factory
        .materialize(&three_step_chain(), "client-1", SQUARE_FEATURE)
        .await?;
    let fan_out = factory
        .materialize(
            &DefinitionBuilder::new("fan-out")
                .step(1, "notification")
                .step(2, "notification")
                .step(3, "polygonArea")
                .build(),
            "client-2",
            SQUARE_FEATURE,
        )
        .await?;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let runner = TaskRunner::new(shared.clone(), registry);
    let executor = RealExecutorBackend::new(runner, rt_tx.clone(), 4);

    let options = RuntimeOptions {
        poll_interval: Duration::from_millis(10),
        exit_when_idle: true,
    };
    let runtime = Runtime::new(
        CoreRuntime::new(options),
        Scheduler::new(shared.clone()),
        rt_rx,
        executor,
    );

    with_timeout(runtime.run()).await?;

    for id in [chained.workflow_id, fan_out.workflow_id] {
        let stored = shared.find_workflow(id).await?.ok_or("workflow missing")?;
        assert_eq!(stored.status, WorkflowStatus::Completed);
        assert!(stored.final_result.is_some());
    }

    Ok(())
}

/// Never returns.
struct Stall;

#[async_trait]
impl Job for Stall {
    async fn run(&self, _task: &Task) -> anyhow::Result<Value> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn shutdown_is_honoured_while_a_job_hangs_with_a_full_backlog() -> TestResult {
    init_tracing();

    let shared: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut registry = JobRegistry::new();
    registry.register("stall", || Box::new(Stall) as Box<dyn Job>)?;
    let registry = Arc::new(registry);

    // More independent tasks than any executor queue would hold.
    let definition = (1..=40)
        .fold(DefinitionBuilder::new("backlog"), |b, n| b.step(n, "stall"))
        .build();
    let workflow = WorkflowFactory::new(shared.clone(), Some(registry.clone()))
        .materialize(&definition, "client-1", "{}")
        .await?;

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let runner = TaskRunner::new(shared.clone(), registry);
    let executor = RealExecutorBackend::new(runner, rt_tx.clone(), 1);
    let options = RuntimeOptions {
        poll_interval: Duration::from_millis(10),
        exit_when_idle: false,
    };
    let runtime = Runtime::new(
        CoreRuntime::new(options),
        Scheduler::new(shared.clone()),
        rt_rx,
        executor,
    );

    let started = Instant::now();
    let handle = tokio::spawn(runtime.run());
    sleep(Duration::from_millis(200)).await;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    with_timeout(handle).await??;
    assert!(started.elapsed() < Duration::from_secs(2));

    let stored = shared
        .find_workflow(workflow.workflow_id)
        .await?
        .ok_or("workflow missing")?;
    let in_progress = stored
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();
    assert_eq!(in_progress, 1);

    Ok(())
}
