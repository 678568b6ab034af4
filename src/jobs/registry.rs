// src/jobs/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{
    Job, NOTIFICATION, NotificationJob, POLYGON_AREA, PolygonAreaJob, REPORT_GENERATION,
    ReportGenerationJob,
};
use crate::errors::{Result, StepwiseError};
use crate::store::Store;

/// Builds a fresh job instance for one execution.
pub type JobFactory = Arc<dyn Fn() -> Box<dyn Job> + Send + Sync>;

/// Lookup from task-type identifier to job factory.
#[derive(Clone, Default)]
pub struct JobRegistry {
    factories: BTreeMap<String, JobFactory>,
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("task_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in job. `reportGeneration` reads the store.
    pub fn with_builtin_jobs(store: Arc<dyn Store>) -> Self {
        let mut registry = Self::new();
        registry.insert(POLYGON_AREA, Arc::new(|| Box::new(PolygonAreaJob) as Box<dyn Job>));
        registry.insert(NOTIFICATION, Arc::new(|| Box::new(NotificationJob) as Box<dyn Job>));
        registry.insert(
            REPORT_GENERATION,
            Arc::new(move || Box::new(ReportGenerationJob::new(store.clone())) as Box<dyn Job>),
        );
        registry
    }

    /// Register a factory for `task_type`.
    ///
    /// Registering the same identifier twice is a configuration error.
    pub fn register<F>(&mut self, task_type: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Job> + Send + Sync + 'static,
    {
        let task_type = task_type.into();
        if self.factories.contains_key(&task_type) {
            return Err(StepwiseError::DuplicateTaskType(task_type));
        }
        debug!(task_type = %task_type, "registering job");
        self.factories.insert(task_type, Arc::new(factory));
        Ok(())
    }

    fn insert(&mut self, task_type: &str, factory: JobFactory) {
        self.factories.insert(task_type.to_string(), factory);
    }

    /// Build the job for `task_type`, failing for unregistered identifiers.
    pub fn resolve(&self, task_type: &str) -> Result<Box<dyn Job>> {
        self.factories
            .get(task_type)
            .map(|factory| factory())
            .ok_or_else(|| StepwiseError::UnknownTaskType(task_type.to_string()))
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.factories.contains_key(task_type)
    }

    pub fn task_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|s| s.as_str())
    }
}
