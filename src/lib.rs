// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod jobs;
pub mod logging;
pub mod model;
pub mod query;
pub mod store;
pub mod types;
pub mod workflow;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::model::{EngineConfig, WorkflowDefinition};
use crate::config::{load_definition, load_engine_config_or_default};
use crate::dag::Scheduler;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::StepwiseError;
use crate::exec::{RealExecutorBackend, TaskRunner};
use crate::jobs::JobRegistry;
use crate::query::QueryError;
use crate::store::{MemoryStore, SqliteStore, Store};
use crate::workflow::WorkflowFactory;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_engine_config_or_default(&args.config)?;

    match args.command {
        Command::Run { until_idle } => run_scheduler(&cfg, until_idle).await,
        Command::Submit {
            definition,
            client_id,
            input,
        } => submit(&cfg, &definition, &client_id, input.as_deref()).await,
        Command::Status { workflow_id } => {
            let store = open_store(&cfg).await?;
            print_query(query::workflow_status(store.as_ref(), workflow_id).await)
        }
        Command::Results { workflow_id } => {
            let store = open_store(&cfg).await?;
            print_query(query::workflow_results(store.as_ref(), workflow_id).await)
        }
        Command::Validate { definition } => validate(&definition),
    }
}

/// Connect to the configured SQLite database; the schema is applied on
/// connect.
pub async fn open_store(cfg: &EngineConfig) -> Result<Arc<dyn Store>> {
    let store = SqliteStore::connect(&cfg.store.database_url)
        .await
        .with_context(|| format!("opening store at {}", cfg.store.database_url))?;
    debug!(database_url = %cfg.store.database_url, "store ready");
    Ok(Arc::new(store))
}

/// Wire store, scheduler, executor and runtime together and run until
/// Ctrl-C (or until idle).
async fn run_scheduler(cfg: &EngineConfig, until_idle: bool) -> Result<()> {
    let store = open_store(cfg).await?;
    let registry = Arc::new(JobRegistry::with_builtin_jobs(store.clone()));
    info!(task_types = ?registry.task_types().collect::<Vec<_>>(), "jobs registered");

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let runner = TaskRunner::new(store.clone(), registry);
    let executor =
        RealExecutorBackend::new(runner, rt_tx.clone(), cfg.scheduler.max_concurrent_tasks);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let options = RuntimeOptions {
        poll_interval: cfg.scheduler.poll_interval(),
        exit_when_idle: until_idle,
    };

    let core = CoreRuntime::new(options);
    let runtime = Runtime::new(core, Scheduler::new(store), rt_rx, executor);
    runtime.run().await?;
    Ok(())
}

async fn submit(
    cfg: &EngineConfig,
    definition_path: &Path,
    client_id: &str,
    input_path: Option<&Path>,
) -> Result<()> {
    let definition = load_definition(definition_path)?;
    let input = read_input(input_path)?;

    let store = open_store(cfg).await?;
    let registry = Arc::new(JobRegistry::with_builtin_jobs(store.clone()));
    let factory = WorkflowFactory::new(store, Some(registry));

    let workflow = factory.materialize(&definition, client_id, &input).await?;
    print_json(&serde_json::json!({ "workflowId": workflow.workflow_id }))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading input payload {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading input payload from stdin")?;
            Ok(buf)
        }
    }
}

/// Dry run: validate a definition and print its steps.
fn validate(path: &Path) -> Result<()> {
    let definition = load_definition(path)?;

    let registry = JobRegistry::with_builtin_jobs(Arc::new(MemoryStore::new()));
    if let Some(step) = definition
        .steps
        .iter()
        .find(|s| !registry.contains(&s.task_type))
    {
        return Err(StepwiseError::UnknownTaskType(step.task_type.clone()).into());
    }

    print_definition(&definition);
    Ok(())
}

fn print_definition(definition: &WorkflowDefinition) {
    println!("stepwise dry-run");
    println!("workflow: {}", definition.name);
    println!();

    println!("steps ({}):", definition.steps.len());
    for step in definition.steps.iter() {
        println!("  - step {}: {}", step.step_number, step.task_type);
        if let Some(dep) = step.depends_on {
            match definition.step(dep) {
                Some(_) => println!("      depends on: step {dep}"),
                None => println!("      depends on: step {dep} (missing; will be dropped)"),
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_query<T: Serialize>(response: std::result::Result<T, QueryError>) -> Result<()> {
    match response {
        Ok(body) => print_json(&body),
        Err(err) => {
            print_json(&err.body())?;
            Err(anyhow::anyhow!("query failed with status {}", err.status_code()))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
