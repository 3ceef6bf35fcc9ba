//! PostgreSQL-backed task store.
//!
//! This module provides the durable queue operations: enqueue, atomic claim,
//! progress updates, terminal transitions, typed result rows, status views,
//! and retention sweeps.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::status::{
    eta_for_position, PendingPreview, ProcessingSnapshot, QueueStatus, StatusCounts, StatusQuery,
    TaskPage, PREVIEW_LIMIT, RECENT_LIMIT,
};
use super::task::{NewTask, ResultKind, Task, TaskStatus};
use crate::error::TaskError;

/// Trait for task queue storage.
///
/// Implementations provide durable storage and the atomic claim that makes
/// multi-worker processing safe. All operations act on plain serializable
/// records.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Validate and insert a `pending` task, returning its id immediately.
    ///
    /// Fire-and-forget: the caller never blocks on execution.
    async fn enqueue(&self, input: NewTask) -> Result<Uuid, TaskError>;

    /// Atomically claim the most urgent pending task for `worker_id`.
    ///
    /// Selects the oldest row with the lowest priority number and flips it
    /// to `processing` in one transaction. Two concurrent claims never
    /// select the same row.
    async fn claim(&self, worker_id: &str) -> Result<Option<Task>, TaskError>;

    /// Fetch a task by id.
    async fn get(&self, id: Uuid) -> Result<Option<Task>, TaskError>;

    /// Record progress (0–100) and an optional message.
    ///
    /// Only applied while the task is `processing`.
    async fn update_progress(
        &self,
        id: Uuid,
        progress: i32,
        message: Option<&str>,
    ) -> Result<(), TaskError>;

    /// Mark a task `completed` with its result reference.
    async fn complete(&self, id: Uuid, result_ref: &str) -> Result<(), TaskError>;

    /// Mark a task `failed` with the captured error text. No auto-retry.
    async fn fail(&self, id: Uuid, error: &str) -> Result<(), TaskError>;

    /// Cancel a `pending` or `processing` task.
    ///
    /// Cooperative only: an in-flight handler is not preempted. Returns
    /// whether a row was transitioned.
    async fn cancel(&self, id: Uuid) -> Result<bool, TaskError>;

    /// Persist a typed result payload for a task.
    async fn store_result(
        &self,
        id: Uuid,
        kind: ResultKind,
        payload: serde_json::Value,
    ) -> Result<(), TaskError>;

    /// Fetch a stored result payload.
    async fn get_result(
        &self,
        id: Uuid,
        kind: ResultKind,
    ) -> Result<Option<serde_json::Value>, TaskError>;

    /// Build the queue status view. May lag in-flight writes by one tick.
    async fn status(&self, query: StatusQuery) -> Result<QueueStatus, TaskError>;

    /// Delete terminal tasks older than `retention`. Returns rows removed.
    async fn sweep(&self, retention: Duration) -> Result<u64, TaskError>;
}

/// PostgreSQL-backed task store.
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn enqueue(&self, input: NewTask) -> Result<Uuid, TaskError> {
        let task = input.into_task()?;

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, task_type, params, status, priority, progress, progress_message,
                error_message, result_ref, worker_id, user_id,
                created_at, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(task.id)
        .bind(task.task_type)
        .bind(&task.params)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.progress)
        .bind(&task.progress_message)
        .bind(&task.error_message)
        .bind(&task.result_ref)
        .bind(&task.worker_id)
        .bind(&task.user_id)
        .bind(task.created_at)
        .bind(task.started_at)
        .bind(task.completed_at)
        .execute(&self.pool)
        .await?;

        info!(task_id = %task.id, task_type = %task.task_type.as_str(), "task enqueued");
        Ok(task.id)
    }

    async fn claim(&self, worker_id: &str) -> Result<Option<Task>, TaskError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            WITH next_task AS (
                SELECT id
                FROM tasks
                WHERE status = 'pending'
                ORDER BY priority ASC, created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE tasks
            SET status = 'processing',
                worker_id = $1,
                started_at = NOW(),
                progress = 0
            WHERE id IN (SELECT id FROM next_task)
            RETURNING id, task_type, params, status, priority, progress, progress_message,
                      error_message, result_ref, worker_id, user_id,
                      created_at, started_at, completed_at
            "#,
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>, TaskError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, params, status, priority, progress, progress_message,
                   error_message, result_ref, worker_id, user_id,
                   created_at, started_at, completed_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: i32,
        message: Option<&str>,
    ) -> Result<(), TaskError> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET progress = $2,
                progress_message = COALESCE($3, progress_message)
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(progress.clamp(0, 100))
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete(&self, id: Uuid, result_ref: &str) -> Result<(), TaskError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'completed',
                progress = 100,
                result_ref = $2,
                completed_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(result_ref)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // The task was cancelled out from under the worker.
            warn!(task_id = %id, "complete skipped: task no longer processing");
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), TaskError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'failed',
                error_message = $2,
                completed_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(task_id = %id, "fail skipped: task no longer processing");
        }
        Ok(())
    }

    async fn cancel(&self, id: Uuid) -> Result<bool, TaskError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'cancelled',
                completed_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn store_result(
        &self,
        id: Uuid,
        kind: ResultKind,
        payload: serde_json::Value,
    ) -> Result<(), TaskError> {
        sqlx::query(
            r#"
            INSERT INTO task_results (task_id, kind, payload)
            VALUES ($1, $2, $3)
            ON CONFLICT (task_id, kind) DO UPDATE SET payload = EXCLUDED.payload
            "#,
        )
        .bind(id)
        .bind(kind.as_str())
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_result(
        &self,
        id: Uuid,
        kind: ResultKind,
    ) -> Result<Option<serde_json::Value>, TaskError> {
        let payload = sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            SELECT payload FROM task_results
            WHERE task_id = $1 AND kind = $2
            "#,
        )
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(payload)
    }

    async fn status(&self, query: StatusQuery) -> Result<QueueStatus, TaskError> {
        let now = Utc::now();

        let mut counts = StatusCounts::default();
        let rows = sqlx::query_as::<_, (TaskStatus, i64)>(
            r#"
            SELECT status, COUNT(*)
            FROM tasks
            WHERE created_at >= NOW() - INTERVAL '24 hours'
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        for (status, count) in rows {
            counts.bump(status, count);
        }

        let current = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, params, status, priority, progress, progress_message,
                   error_message, result_ref, worker_id, user_id,
                   created_at, started_at, completed_at
            FROM tasks
            WHERE status = 'processing'
            ORDER BY started_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?
        .map(|task| ProcessingSnapshot {
            elapsed_secs: task.elapsed_secs(now).unwrap_or(0),
            task,
        });

        let pending = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, params, status, priority, progress, progress_message,
                   error_message, result_ref, worker_id, user_id,
                   created_at, started_at, completed_at
            FROM tasks
            WHERE status = 'pending'
            ORDER BY priority ASC, created_at ASC
            LIMIT $1
            "#,
        )
        .bind(PREVIEW_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;
        let pending_preview = pending
            .into_iter()
            .enumerate()
            .map(|(position, task)| PendingPreview {
                eta_secs: eta_for_position(position),
                task,
            })
            .collect();

        let recent = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, params, status, priority, progress, progress_message,
                   error_message, result_ref, worker_id, user_id,
                   created_at, started_at, completed_at
            FROM tasks
            WHERE status IN ('completed', 'failed', 'cancelled')
            ORDER BY completed_at DESC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(RECENT_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM tasks
            WHERE ($1::task_status IS NULL OR status = $1)
              AND ($2::task_type IS NULL OR task_type = $2)
            "#,
        )
        .bind(query.filter.status)
        .bind(query.filter.task_type)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, params, status, priority, progress, progress_message,
                   error_message, result_ref, worker_id, user_id,
                   created_at, started_at, completed_at
            FROM tasks
            WHERE ($1::task_status IS NULL OR status = $1)
              AND ($2::task_type IS NULL OR task_type = $2)
            ORDER BY
                CASE status
                    WHEN 'processing' THEN 0
                    WHEN 'pending' THEN 1
                    ELSE 2
                END,
                CASE WHEN status = 'pending' THEN priority END ASC NULLS LAST,
                CASE WHEN status IN ('pending', 'processing') THEN created_at END ASC NULLS LAST,
                completed_at DESC NULLS LAST
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.filter.status)
        .bind(query.filter.task_type)
        .bind(query.page_size as i64)
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(QueueStatus {
            counts,
            current,
            pending_preview,
            recent,
            tasks: TaskPage {
                items,
                page: query.page.max(1),
                page_size: query.page_size,
                total,
            },
        })
    }

    async fn sweep(&self, retention: Duration) -> Result<u64, TaskError> {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE status IN ('completed', 'failed', 'cancelled')
              AND completed_at < NOW() - ($1 || ' seconds')::INTERVAL
            "#,
        )
        .bind(retention.num_seconds().to_string())
        .execute(&self.pool)
        .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, "swept terminal tasks past retention");
        }
        Ok(removed)
    }
}
