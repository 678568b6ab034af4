// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`task_runner`] runs one task end to end: claim, job, result, status,
//!   aggregation.
//! - [`executor_loop`] owns the background loop that runs dispatched tasks
//!   with bounded concurrency and reports back to the runtime.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production, which tests can replace with a
//!   fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
pub use task_runner::{ExecutionOutcome, STARTING_PROGRESS, TaskRunner};
