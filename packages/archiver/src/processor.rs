//! Queue processor: polls, claims, dispatches, records.
//!
//! One processor instance runs a single poll loop with at most one task in
//! flight; ticks never overlap because the claimed task is awaited inline.
//! Horizontal scale-out means running more instances with distinct worker
//! ids — the store's atomic claim is the only synchronization point.
//!
//! ```text
//! Processor
//!     │
//!     ├─► Claim one task (TaskStore::claim)
//!     ├─► Resolve handler by type (HandlerRegistry)
//!     ├─► Coarse progress update, then handler.execute(...)
//!     └─► Record outcome (complete / store_result / fail)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::deps::Deps;
use crate::error::TaskError;
use crate::handlers::{HandlerOutput, HandlerRegistry};
use crate::tasks::{ResultKind, Task, TaskStore};

/// Configuration for the queue processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Fixed delay between polls when the queue is idle.
    pub poll_interval: Duration,
    /// Worker ID for this instance.
    pub worker_id: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

impl ProcessorConfig {
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

/// Background service that processes tasks from the queue.
pub struct Processor {
    deps: Deps,
    registry: HandlerRegistry,
    config: ProcessorConfig,
    shutdown: Arc<AtomicBool>,
}

impl Processor {
    pub fn new(deps: Deps, registry: HandlerRegistry) -> Self {
        Self::with_config(deps, registry, ProcessorConfig::default())
    }

    pub fn with_config(deps: Deps, registry: HandlerRegistry, config: ProcessorConfig) -> Self {
        Self {
            deps,
            registry,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shutdown handle for graceful shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run the poll loop until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "queue processor starting"
        );

        loop {
            if self.is_shutdown_requested() {
                break;
            }

            match self.tick().await {
                Ok(true) => {}
                Ok(false) => {
                    // Idle: nothing pending.
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(e) => {
                    // Store trouble aborts only this iteration; the loop
                    // retries the store on the next tick.
                    error!(error = %e, "poll iteration failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "queue processor stopped");
        Ok(())
    }

    /// Run until a Ctrl+C signal arrives.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }

    /// Claim and execute at most one task.
    ///
    /// Returns whether a task was claimed. Handler failures are recorded on
    /// the task and do not surface here; only store failures do.
    pub async fn tick(&self) -> Result<bool, TaskError> {
        let Some(task) = self.deps.tasks.claim(&self.config.worker_id).await? else {
            return Ok(false);
        };

        debug!(task_id = %task.id, task_type = %task.task_type.as_str(), "claimed task");
        self.run_task(task).await;
        Ok(true)
    }

    async fn run_task(&self, task: Task) {
        let task_id = task.id;
        let task_type = task.task_type;

        // Unregistered type: immediate terminal failure, no retry.
        let Some(handler) = self.registry.resolve(task_type) else {
            warn!(task_id = %task_id, task_type = %task_type.as_str(), "no handler registered");
            self.mark_failed(
                task_id,
                &format!("no handler registered for task type {}", task_type.as_str()),
            )
            .await;
            return;
        };

        if let Err(e) = self
            .deps
            .tasks
            .update_progress(
                task_id,
                5,
                Some(&format!("running {} task", task_type.as_str())),
            )
            .await
        {
            error!(task_id = %task_id, error = %e, "failed to record progress");
        }

        match handler.execute(&task, &self.deps).await {
            Ok(HandlerOutput::Extraction { id, item_count }) => {
                info!(
                    task_id = %task_id,
                    extraction_id = %id,
                    item_count,
                    "task succeeded"
                );
                self.mark_completed(task_id, &id.to_string()).await;
            }
            Ok(HandlerOutput::Payload(payload)) => match ResultKind::for_task_type(task_type) {
                Some(kind) => {
                    if let Err(e) = self.deps.tasks.store_result(task_id, kind, payload).await {
                        error!(task_id = %task_id, error = %e, "failed to store result");
                        self.mark_failed(task_id, &format!("failed to store result: {}", e))
                            .await;
                        return;
                    }
                    info!(task_id = %task_id, kind = kind.as_str(), "task succeeded");
                    self.mark_completed(task_id, kind.as_str()).await;
                }
                None => {
                    self.mark_failed(
                        task_id,
                        &format!(
                            "handler for {} returned a payload without a result kind",
                            task_type.as_str()
                        ),
                    )
                    .await;
                }
            },
            Err(e) => {
                warn!(task_id = %task_id, task_type = %task_type.as_str(), error = %e, "task failed");
                self.mark_failed(task_id, &e.to_string()).await;
            }
        }
    }

    async fn mark_completed(&self, task_id: Uuid, result_ref: &str) {
        if let Err(e) = self.deps.tasks.complete(task_id, result_ref).await {
            error!(task_id = %task_id, error = %e, "failed to mark task completed");
        }
    }

    async fn mark_failed(&self, task_id: Uuid, message: &str) {
        if let Err(e) = self.deps.tasks.fail(task_id, message).await {
            error!(task_id = %task_id, error = %e, "failed to mark task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert!(config.worker_id.starts_with("worker-"));
    }

    #[test]
    fn config_with_worker_id() {
        let config = ProcessorConfig::with_worker_id("instance-a");
        assert_eq!(config.worker_id, "instance-a");
    }
}
