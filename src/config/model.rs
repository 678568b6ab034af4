// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Engine configuration as read from `Stepwise.toml`.
///
/// ```toml
/// [scheduler]
/// poll_interval_ms = 5000
/// max_concurrent_tasks = 1
///
/// [store]
/// database_url = "sqlite://stepwise.db"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub store: StoreSection,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Milliseconds between scheduler ticks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How many tasks may execute at once. `1` runs tasks sequentially in
    /// dispatch order.
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
}

impl SchedulerSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_max_concurrent_tasks() -> usize {
    1
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_database_url() -> String {
    "sqlite://stepwise.db".to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

/// A workflow definition document exactly as deserialized.
///
/// ```yaml
/// name: example
/// steps:
///   - taskType: polygonArea
///     stepNumber: 1
///   - taskType: notification
///     stepNumber: 2
///     dependsOn: 1
/// ```
///
/// Use [`WorkflowDefinition::try_from`] to validate it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflowDefinition {
    pub name: String,

    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// One declared step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub task_type: String,

    pub step_number: u32,

    /// Step number of the predecessor within the same document.
    #[serde(default)]
    pub depends_on: Option<u32>,
}

/// A validated workflow definition: at least one step, unique step numbers,
/// no dependency cycles.
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    pub name: String,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    /// Build without validation. Only `config::validate` should call this.
    pub(crate) fn new_unchecked(name: String, steps: Vec<StepDefinition>) -> Self {
        Self { name, steps }
    }

    pub fn step(&self, step_number: u32) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }
}
