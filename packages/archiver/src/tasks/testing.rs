//! In-memory task store for tests.
//!
//! Implements [`TaskStore`] over a mutex so the processor and queue suites
//! run without a database. The claim is atomic under the lock, which keeps
//! the exactly-once claim property observable in concurrent tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::status::{assemble, QueueStatus, StatusQuery};
use super::store::TaskStore;
use super::task::{NewTask, ResultKind, Task, TaskStatus};
use crate::error::TaskError;

#[derive(Default)]
struct Inner {
    tasks: Vec<Task>,
    results: HashMap<(Uuid, &'static str), serde_json::Value>,
}

/// Mutex-backed [`TaskStore`] double.
#[derive(Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every task, for assertions.
    pub fn all_tasks(&self) -> Vec<Task> {
        self.inner.lock().unwrap().tasks.clone()
    }

    /// Insert a row as-is, bypassing enqueue validation.
    ///
    /// Lets tests seed rows in shapes enqueue no longer produces, such as
    /// the legacy flat params blob.
    pub fn push_raw(&self, task: Task) {
        self.inner.lock().unwrap().tasks.push(task);
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn enqueue(&self, input: NewTask) -> Result<Uuid, TaskError> {
        let task = input.into_task()?;
        let id = task.id;
        self.inner.lock().unwrap().tasks.push(task);
        Ok(id)
    }

    async fn claim(&self, worker_id: &str) -> Result<Option<Task>, TaskError> {
        let mut inner = self.inner.lock().unwrap();
        let next = inner
            .tasks
            .iter_mut()
            .filter(|t| t.status == TaskStatus::Pending)
            .min_by_key(|t| (t.priority, t.created_at));

        Ok(next.map(|task| {
            task.status = TaskStatus::Processing;
            task.worker_id = Some(worker_id.to_string());
            task.started_at = Some(Utc::now());
            task.progress = 0;
            task.clone()
        }))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>, TaskError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: i32,
        message: Option<&str>,
    ) -> Result<(), TaskError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(task) = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.status == TaskStatus::Processing)
        {
            task.progress = progress.clamp(0, 100);
            if let Some(message) = message {
                task.progress_message = Some(message.to_string());
            }
        }
        Ok(())
    }

    async fn complete(&self, id: Uuid, result_ref: &str) -> Result<(), TaskError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(task) = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.status == TaskStatus::Processing)
        {
            task.status = TaskStatus::Completed;
            task.progress = 100;
            task.result_ref = Some(result_ref.to_string());
            task.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<(), TaskError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(task) = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.status == TaskStatus::Processing)
        {
            task.status = TaskStatus::Failed;
            task.error_message = Some(error.to_string());
            task.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn cancel(&self, id: Uuid) -> Result<bool, TaskError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(task) = inner.tasks.iter_mut().find(|t| {
            t.id == id && matches!(t.status, TaskStatus::Pending | TaskStatus::Processing)
        }) {
            task.status = TaskStatus::Cancelled;
            task.completed_at = Some(Utc::now());
            return Ok(true);
        }
        Ok(false)
    }

    async fn store_result(
        &self,
        id: Uuid,
        kind: ResultKind,
        payload: serde_json::Value,
    ) -> Result<(), TaskError> {
        self.inner
            .lock()
            .unwrap()
            .results
            .insert((id, kind.as_str()), payload);
        Ok(())
    }

    async fn get_result(
        &self,
        id: Uuid,
        kind: ResultKind,
    ) -> Result<Option<serde_json::Value>, TaskError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .results
            .get(&(id, kind.as_str()))
            .cloned())
    }

    async fn status(&self, query: StatusQuery) -> Result<QueueStatus, TaskError> {
        let inner = self.inner.lock().unwrap();
        Ok(assemble(&inner.tasks, &query, Utc::now()))
    }

    async fn sweep(&self, retention: Duration) -> Result<u64, TaskError> {
        let cutoff = Utc::now() - retention;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tasks.len();
        inner.tasks.retain(|t| {
            !(t.status.is_terminal() && t.completed_at.map(|at| at < cutoff).unwrap_or(false))
        });
        Ok((before - inner.tasks.len()) as u64)
    }
}
