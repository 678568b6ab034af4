// src/jobs/notification.rs

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::Job;
use crate::model::Task;

/// Stand-in for notification delivery: records the delivery in the log and
/// produces no output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotificationJob;

#[async_trait]
impl Job for NotificationJob {
    async fn run(&self, task: &Task) -> Result<Value> {
        info!(
            task_id = %task.task_id,
            workflow_id = %task.workflow_id,
            client_id = %task.client_id,
            "notification sent"
        );
        Ok(Value::Null)
    }
}
