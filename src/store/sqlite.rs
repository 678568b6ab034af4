// src/store/sqlite.rs

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::model::{Task, TaskResult, Workflow};
use crate::types::{ResultId, TaskId, TaskStatus, WorkflowId, WorkflowStatus};

const TASK_COLUMNS: &str = "task_id, workflow_id, client_id, task_type, input, status, \
                            progress, result_id, step_number, depends_on";

/// SQLite-based store implementation.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct WorkflowRow {
    workflow_id: String,
    client_id: String,
    status: WorkflowStatus,
    final_result: Option<String>,
}

#[derive(FromRow)]
struct TaskRow {
    task_id: String,
    workflow_id: String,
    client_id: String,
    task_type: String,
    input: String,
    status: TaskStatus,
    progress: Option<String>,
    result_id: Option<String>,
    step_number: i64,
    depends_on: Option<String>,
}

#[derive(FromRow)]
struct ResultRow {
    result_id: String,
    task_id: String,
    data: String,
}

fn parse_id(column: &str, raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw)
        .map_err(|e| StoreError::Corrupt(format!("{column} '{raw}' is not a UUID: {e}")))
}

fn parse_optional_id(column: &str, raw: Option<&str>) -> Result<Option<Uuid>, StoreError> {
    raw.map(|r| parse_id(column, r)).transpose()
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let step_number = u32::try_from(row.step_number).map_err(|_| {
            StoreError::Corrupt(format!(
                "task {} has out-of-range step number {}",
                row.task_id, row.step_number
            ))
        })?;

        Ok(Task {
            task_id: parse_id("task_id", &row.task_id)?,
            workflow_id: parse_id("workflow_id", &row.workflow_id)?,
            client_id: row.client_id,
            task_type: row.task_type,
            input: row.input,
            status: row.status,
            progress: row.progress,
            result_id: parse_optional_id("result_id", row.result_id.as_deref())?,
            step_number,
            depends_on: parse_optional_id("depends_on", row.depends_on.as_deref())?,
        })
    }
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url` and apply the
    /// schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` opens a distinct database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn task_exists(&self, task_id: TaskId) -> Result<bool, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT task_id FROM tasks WHERE task_id = ?")
            .bind(task_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn workflow_exists(&self, workflow_id: WorkflowId) -> Result<bool, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT workflow_id FROM workflows WHERE workflow_id = ?")
                .bind(workflow_id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO workflows (workflow_id, client_id, status, final_result)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(workflow.workflow_id.to_string())
        .bind(&workflow.client_id)
        .bind(workflow.status)
        .bind(&workflow.final_result)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for task in tasks {
            sqlx::query(
                r#"
                INSERT INTO tasks (task_id, workflow_id, client_id, task_type, input, status,
                                   progress, result_id, step_number, depends_on)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(task.task_id.to_string())
            .bind(task.workflow_id.to_string())
            .bind(&task.client_id)
            .bind(&task.task_type)
            .bind(&task.input)
            .bind(task.status)
            .bind(&task.progress)
            .bind(task.result_id.map(|id| id.to_string()))
            .bind(i64::from(task.step_number))
            .bind(task.depends_on.map(|id| id.to_string()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for task in tasks {
            let updated = sqlx::query(
                r#"
                UPDATE tasks
                SET status = ?, progress = ?, result_id = ?, depends_on = ?
                WHERE task_id = ?
                "#,
            )
            .bind(task.status)
            .bind(&task.progress)
            .bind(task.result_id.map(|id| id.to_string()))
            .bind(task.depends_on.map(|id| id.to_string()))
            .bind(task.task_id.to_string())
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("task {}", task.task_id)));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_task(&self, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?"))
                .bind(task_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Task::try_from).transpose()
    }

    async fn find_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE status = ? ORDER BY workflow_id, step_number"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    async fn claim_task(&self, task_id: TaskId, progress: &str) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, progress = ?
            WHERE task_id = ? AND status = ?
            "#,
        )
        .bind(TaskStatus::InProgress)
        .bind(progress)
        .bind(task_id.to_string())
        .bind(TaskStatus::Queued)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(true);
        }
        if self.task_exists(task_id).await? {
            Ok(false)
        } else {
            Err(StoreError::NotFound(format!("task {task_id}")))
        }
    }

    async fn finish_task(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        result_id: Option<ResultId>,
    ) -> Result<bool, StoreError> {
        if !status.is_terminal() {
            return Ok(false);
        }

        let updated = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, progress = NULL, result_id = ?
            WHERE task_id = ? AND status = ?
            "#,
        )
        .bind(status)
        .bind(result_id.map(|id| id.to_string()))
        .bind(task_id.to_string())
        .bind(TaskStatus::InProgress)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(true);
        }
        if self.task_exists(task_id).await? {
            Ok(false)
        } else {
            Err(StoreError::NotFound(format!("task {task_id}")))
        }
    }

    async fn insert_result(&self, result: &TaskResult) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO results (result_id, task_id, data) VALUES (?, ?, ?)")
            .bind(result.result_id.to_string())
            .bind(result.task_id.to_string())
            .bind(&result.data)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_result(&self, result_id: ResultId) -> Result<Option<TaskResult>, StoreError> {
        let row: Option<ResultRow> =
            sqlx::query_as("SELECT result_id, task_id, data FROM results WHERE result_id = ?")
                .bind(result_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| {
            Ok(TaskResult {
                result_id: parse_id("result_id", &r.result_id)?,
                task_id: parse_id("task_id", &r.task_id)?,
                data: r.data,
            })
        })
        .transpose()
    }

    async fn find_workflow(&self, workflow_id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        let row: Option<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT workflow_id, client_id, status, final_result
            FROM workflows
            WHERE workflow_id = ?
            "#,
        )
        .bind(workflow_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let task_rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE workflow_id = ? ORDER BY step_number"
        ))
        .bind(workflow_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let tasks = task_rows
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Workflow {
            workflow_id: parse_id("workflow_id", &row.workflow_id)?,
            client_id: row.client_id,
            status: row.status,
            final_result: row.final_result,
            tasks,
        }))
    }

    async fn update_workflow_status(
        &self,
        workflow_id: WorkflowId,
        status: WorkflowStatus,
    ) -> Result<(), StoreError> {
        let updated = sqlx::query("UPDATE workflows SET status = ? WHERE workflow_id = ?")
            .bind(status)
            .bind(workflow_id.to_string())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("workflow {workflow_id}")));
        }
        Ok(())
    }

    async fn set_final_result(
        &self,
        workflow_id: WorkflowId,
        report: &str,
    ) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE workflows
            SET final_result = ?
            WHERE workflow_id = ? AND final_result IS NULL
            "#,
        )
        .bind(report)
        .bind(workflow_id.to_string())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(true);
        }
        if self.workflow_exists(workflow_id).await? {
            Ok(false)
        } else {
            Err(StoreError::NotFound(format!("workflow {workflow_id}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("stepwise.db").display());
        let store = SqliteStore::connect(&url).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn workflow_round_trips_with_ordered_tasks() {
        let (_dir, store) = open().await;

        let workflow = Workflow::new("client-1");
        store.insert_workflow(&workflow).await.unwrap();

        let second = Task::new_queued(workflow.workflow_id, "client-1", "notification", "{}", 2);
        let mut first = Task::new_queued(workflow.workflow_id, "client-1", "polygonArea", "{}", 1);
        store
            .insert_tasks(&[second.clone(), first.clone()])
            .await
            .unwrap();

        first.depends_on = Some(second.task_id);
        store.update_tasks(std::slice::from_ref(&first)).await.unwrap();

        let loaded = store.find_workflow(workflow.workflow_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, WorkflowStatus::Initial);
        assert_eq!(loaded.tasks, vec![first, second]);
    }

    #[tokio::test]
    async fn conditional_transitions_apply_once() {
        let (_dir, store) = open().await;

        let workflow = Workflow::new("client-1");
        store.insert_workflow(&workflow).await.unwrap();
        let task = Task::new_queued(workflow.workflow_id, "client-1", "notification", "{}", 1);
        store.insert_tasks(std::slice::from_ref(&task)).await.unwrap();

        assert!(store.claim_task(task.task_id, "starting job...").await.unwrap());
        assert!(!store.claim_task(task.task_id, "starting job...").await.unwrap());

        let result = TaskResult::new(task.task_id, "{}");
        store.insert_result(&result).await.unwrap();
        assert!(
            store
                .finish_task(task.task_id, TaskStatus::Completed, Some(result.result_id))
                .await
                .unwrap()
        );
        assert!(!store.finish_task(task.task_id, TaskStatus::Failed, None).await.unwrap());

        let stored = store.find_task(task.task_id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.result_id, Some(result.result_id));
        assert_eq!(stored.progress, None);
        assert_eq!(store.find_result(result.result_id).await.unwrap(), Some(result));

        assert!(store.set_final_result(workflow.workflow_id, "{}").await.unwrap());
        assert!(!store.set_final_result(workflow.workflow_id, "[]").await.unwrap());
    }

    #[tokio::test]
    async fn claiming_unknown_task_is_not_found() {
        let (_dir, store) = open().await;

        let err = store.claim_task(Uuid::new_v4(), "starting").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
