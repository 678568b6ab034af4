// tests/materialize.rs

mod common;
use crate::common::builders::{DefinitionBuilder, three_step_chain};
use crate::common::{SQUARE_FEATURE, init_tracing};

use std::error::Error;
use std::sync::Arc;

use stepwise::jobs::JobRegistry;
use stepwise::store::Store;
use stepwise::workflow::WorkflowFactory;
use stepwise_test_utils::store::InterceptingStore;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn dependent_steps_are_never_ready_while_a_workflow_is_being_written() -> TestResult {
    init_tracing();

    let store = InterceptingStore::new();
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let registry = Arc::new(JobRegistry::with_builtin_jobs(shared.clone()));
    let factory = WorkflowFactory::new(shared, Some(registry));

    factory
        .materialize(&three_step_chain(), "client-1", SQUARE_FEATURE)
        .await?;

    let observed = store.ready_after_writes();
    assert!(!observed.is_empty());
    for ready in observed {
        assert_eq!(ready, vec![1]);
    }

    Ok(())
}

#[tokio::test]
async fn independent_steps_are_ready_as_soon_as_they_are_written() -> TestResult {
    init_tracing();

    let store = InterceptingStore::new();
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let factory = WorkflowFactory::new(shared, None);

    factory
        .materialize(
            &DefinitionBuilder::new("fan-out")
                .step(1, "notification")
                .step(2, "notification")
                .step_after(3, "notification", 9)
                .build(),
            "client-1",
            "{}",
        )
        .await?;

    // The dangling reference on step 3 was dropped before the insert.
    assert_eq!(store.ready_after_writes(), vec![vec![1, 2, 3]]);

    Ok(())
}
