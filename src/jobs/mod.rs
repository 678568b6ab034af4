// src/jobs/mod.rs

//! Job contract and registry.
//!
//! A [`Job`] is the pluggable unit of work bound to a task-type identifier.
//! The execution engine only ever sees `dyn Job`, resolved through the
//! [`JobRegistry`].
//!
//! Built-in jobs:
//! - [`polygon_area`]: geodesic area of a GeoJSON polygon.
//! - [`notification`]: notification delivery stand-in.
//! - [`report_generation`]: interim report over the other tasks of a workflow.

pub mod notification;
pub mod polygon_area;
pub mod registry;
pub mod report_generation;

use async_trait::async_trait;

use crate::model::Task;

pub use notification::NotificationJob;
pub use polygon_area::PolygonAreaJob;
pub use registry::{JobFactory, JobRegistry};
pub use report_generation::ReportGenerationJob;

/// Task-type identifiers of the built-in jobs.
pub const POLYGON_AREA: &str = "polygonArea";
pub const NOTIFICATION: &str = "notification";
pub const REPORT_GENERATION: &str = "reportGeneration";

/// A unit of work run for one task.
///
/// The returned JSON value is stored verbatim as the task's result; `null`
/// is stored as an empty object. Returning an error marks the task failed.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self, task: &Task) -> anyhow::Result<serde_json::Value>;
}
