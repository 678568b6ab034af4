// tests/dangling_dependency.rs

mod common;
use crate::common::{SQUARE_FEATURE, init_tracing, memory_stack};

use std::error::Error;
use std::io::Write;

use tempfile::Builder;

use stepwise::config::load_definition;
use stepwise::dag::Scheduler;
use stepwise::exec::{ExecutionOutcome, TaskRunner};
use stepwise::store::Store;
use stepwise::types::WorkflowStatus;
use stepwise::workflow::WorkflowFactory;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn dependency_on_missing_step_is_dropped_at_load() -> TestResult {
    init_tracing();

    let mut file = Builder::new().suffix(".yaml").tempfile()?;
    write!(
        file,
        r#"
name: dangling
steps:
  - taskType: polygonArea
    stepNumber: 1
  - taskType: notification
    stepNumber: 2
    dependsOn: 7
"#
    )?;

    let definition = load_definition(file.path())?;
    assert_eq!(definition.steps[1].depends_on, Some(7));

    let (_store, shared, registry) = memory_stack();
    let factory = WorkflowFactory::new(shared.clone(), Some(registry.clone()));
    let workflow = factory
        .materialize(&definition, "client-1", SQUARE_FEATURE)
        .await?;

    assert_eq!(workflow.tasks.len(), 2);
    assert!(workflow.tasks.iter().all(|t| t.depends_on.is_none()));

    // Both tasks are runnable on the first tick.
    let ready = Scheduler::new(shared.clone()).select_ready().await?;
    assert_eq!(ready.len(), 2);

    let runner = TaskRunner::new(shared.clone(), registry);
    for task in &ready {
        assert!(matches!(
            runner.execute(task).await?,
            ExecutionOutcome::Completed(_)
        ));
    }

    let stored = shared
        .find_workflow(workflow.workflow_id)
        .await?
        .ok_or("workflow missing")?;
    assert_eq!(stored.status, WorkflowStatus::Completed);

    Ok(())
}
