// tests/sqlite_store.rs

mod common;
use crate::common::builders::three_step_chain;
use crate::common::{SQUARE_FEATURE, init_tracing};

use std::error::Error;
use std::sync::Arc;

use tokio::task::JoinSet;

use stepwise::dag::Scheduler;
use stepwise::exec::{STARTING_PROGRESS, TaskRunner};
use stepwise::jobs::JobRegistry;
use stepwise::query;
use stepwise::store::{SqliteStore, Store};
use stepwise::types::{TaskStatus, WorkflowStatus};
use stepwise::workflow::WorkflowFactory;

type TestResult = Result<(), Box<dyn Error>>;

async fn open(dir: &tempfile::TempDir) -> Result<Arc<dyn Store>, Box<dyn Error>> {
    let url = format!("sqlite://{}", dir.path().join("stepwise.db").display());
    Ok(Arc::new(SqliteStore::connect(&url).await?))
}

#[tokio::test]
async fn concurrent_claims_have_one_winner() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let shared = open(&dir).await?;
    let registry = Arc::new(JobRegistry::with_builtin_jobs(shared.clone()));
    let workflow = WorkflowFactory::new(shared.clone(), Some(registry))
        .materialize(&three_step_chain(), "client-1", SQUARE_FEATURE)
        .await?;
    let task_id = workflow.tasks[0].task_id;

    let mut claims = JoinSet::new();
    for _ in 0..8 {
        let store = shared.clone();
        claims.spawn(async move { store.claim_task(task_id, STARTING_PROGRESS).await });
    }

    let mut winners = 0;
    while let Some(joined) = claims.join_next().await {
        if joined?? {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let task = shared.find_task(task_id).await?.ok_or("task missing")?;
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.progress.as_deref(), Some(STARTING_PROGRESS));

    Ok(())
}

#[tokio::test]
async fn chain_completes_on_disk_and_survives_reopen() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let workflow_id = {
        let shared = open(&dir).await?;
        let registry = Arc::new(JobRegistry::with_builtin_jobs(shared.clone()));
        let workflow = WorkflowFactory::new(shared.clone(), Some(registry.clone()))
            .materialize(&three_step_chain(), "client-1", SQUARE_FEATURE)
            .await?;

        let scheduler = Scheduler::new(shared.clone());
        let runner = TaskRunner::new(shared.clone(), registry);
        for _ in 0..3 {
            let ready = scheduler.select_ready().await?;
            assert_eq!(ready.len(), 1);
            runner.execute(&ready[0]).await?;
        }
        assert!(scheduler.select_ready().await?.is_empty());
        workflow.workflow_id
    };

    let reopened = open(&dir).await?;
    let status = query::workflow_status(reopened.as_ref(), workflow_id).await?;
    assert_eq!(status.status, WorkflowStatus::Completed);
    assert_eq!(status.completed_tasks, 3);

    let results = query::workflow_results(reopened.as_ref(), workflow_id).await?;
    assert_eq!(results.final_result["workflowId"], workflow_id.to_string());
    assert_eq!(results.final_result["status"], "completed");

    Ok(())
}
