//! Task operations: enqueue, claim, complete, recover, list.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::db::{unix_timestamp, SqliteTaskQueue};
use super::types::{QueuedTask, TaskHandle, TaskId, TaskState, WorkItem};
use super::TaskQueue;

fn task_from_row(row: &SqliteRow) -> QueuedTask {
    let state: String = row.get("state");
    QueuedTask {
        id: row.get("id"),
        item: WorkItem {
            job_name: row.get("job_name"),
            method: row.get("method"),
            url: row.get("url"),
            identity_token: row.get("identity_token"),
        },
        state: TaskState::parse(&state),
        attempts: row.get("attempts"),
        last_error: row.get("last_error"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl SqliteTaskQueue {
    pub async fn insert(&self, item: &WorkItem) -> Result<TaskId> {
        let now = unix_timestamp();
        let id = sqlx::query(
            r#"
            INSERT INTO tasks (
                job_name, method, url, identity_token,
                state, attempts, last_error, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6, ?7)
            "#,
        )
        .bind(&item.job_name)
        .bind(&item.method)
        .bind(&item.url)
        .bind(&item.identity_token)
        .bind(TaskState::Queued.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    /// Atomically claim the oldest queued task (queued → running, attempts + 1).
    pub async fn claim_next(&self) -> Result<Option<QueuedTask>> {
        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r#"
            SELECT id FROM tasks
            WHERE state = 'queued'
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };
        let id: i64 = row.get("id");
        sqlx::query(
            r#"
            UPDATE tasks
            SET state = 'running',
                attempts = attempts + 1,
                updated_at = ?1
            WHERE id = ?2
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        let row = sqlx::query(r#"SELECT * FROM tasks WHERE id = ?1"#)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(task_from_row(&row)))
    }

    pub async fn mark_done(&self, id: TaskId) -> Result<()> {
        self.finish(id, TaskState::Done, None).await
    }

    pub async fn mark_failed(&self, id: TaskId, error: &str) -> Result<()> {
        self.finish(id, TaskState::Failed, Some(error)).await
    }

    async fn finish(&self, id: TaskId, state: TaskState, error: Option<&str>) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE tasks
            SET state = ?1,
                last_error = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(state.as_str())
        .bind(error)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Put tasks stranded in `running` (worker crashed) back to `queued`.
    pub async fn recover_running(&self) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE tasks
            SET state = 'queued',
                updated_at = ?1
            WHERE state = 'running'
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// All tasks, oldest first.
    pub async fn list(&self) -> Result<Vec<QueuedTask>> {
        let rows = sqlx::query(r#"SELECT * FROM tasks ORDER BY id ASC"#)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(task_from_row).collect())
    }
}

#[async_trait]
impl TaskQueue for SqliteTaskQueue {
    async fn enqueue(&self, item: &WorkItem) -> Result<TaskHandle> {
        let id = self.insert(item).await?;
        let handle = TaskHandle::for_id(id);
        tracing::info!(job = %item.job_name, task = %handle, "work item queued");
        Ok(handle)
    }
}
