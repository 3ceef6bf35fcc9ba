//! Queue status views.
//!
//! Read-side snapshots of the queue: per-status counts over the trailing 24
//! hours, the currently-processing task, an ETA-annotated preview of the
//! pending queue, recently finished tasks, and a paginated full list. Reads
//! may run concurrently with claims and tolerate one-tick-stale snapshots.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::task::{Task, TaskStatus, TaskType};

/// Naive ETA heuristic: every queued task is assumed to take this long.
pub const ETA_SECS_PER_TASK: i64 = 90;

/// How many pending tasks the preview shows.
pub(crate) const PREVIEW_LIMIT: usize = 5;

/// How many recently finished tasks the status view shows.
pub(crate) const RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct StatusFilter {
    pub status: Option<TaskStatus>,
    pub task_type: Option<TaskType>,
}

#[derive(Debug, Clone)]
pub struct StatusQuery {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub filter: StatusFilter,
}

impl Default for StatusQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            filter: StatusFilter::default(),
        }
    }
}

impl StatusQuery {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.page_size as i64
    }
}

/// Per-status counts over the trailing 24 hours.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    pub(crate) fn bump(&mut self, status: TaskStatus, count: i64) {
        match status {
            TaskStatus::Pending => self.pending += count,
            TaskStatus::Processing => self.processing += count,
            TaskStatus::Completed => self.completed += count,
            TaskStatus::Failed => self.failed += count,
            TaskStatus::Cancelled => self.cancelled += count,
        }
    }
}

/// The task a worker currently holds, with elapsed wall-clock time.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSnapshot {
    pub task: Task,
    pub elapsed_secs: i64,
}

/// One pending task with its naive ETA.
#[derive(Debug, Clone, Serialize)]
pub struct PendingPreview {
    pub task: Task,
    pub eta_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPage {
    pub items: Vec<Task>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub counts: StatusCounts,
    pub current: Option<ProcessingSnapshot>,
    pub pending_preview: Vec<PendingPreview>,
    pub recent: Vec<Task>,
    pub tasks: TaskPage,
}

/// ETA for the task at 0-based `position` in the pending queue.
pub fn eta_for_position(position: usize) -> i64 {
    (position as i64 + 1) * ETA_SECS_PER_TASK
}

fn status_bucket(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Processing => 0,
        TaskStatus::Pending => 1,
        _ => 2,
    }
}

fn matches_filter(task: &Task, filter: &StatusFilter) -> bool {
    if let Some(status) = filter.status {
        if task.status != status {
            return false;
        }
    }
    if let Some(task_type) = filter.task_type {
        if task.task_type != task_type {
            return false;
        }
    }
    true
}

/// Assemble a [`QueueStatus`] from a full task snapshot.
///
/// The Postgres store answers the same questions in SQL; this shared path
/// serves the in-memory store and keeps both views semantically aligned.
pub(crate) fn assemble(all: &[Task], query: &StatusQuery, now: DateTime<Utc>) -> QueueStatus {
    let day_ago = now - Duration::hours(24);
    let mut counts = StatusCounts::default();
    for task in all.iter().filter(|t| t.created_at >= day_ago) {
        counts.bump(task.status, 1);
    }

    let current = all
        .iter()
        .filter(|t| t.status == TaskStatus::Processing)
        .min_by_key(|t| t.started_at)
        .map(|t| ProcessingSnapshot {
            task: t.clone(),
            elapsed_secs: t.elapsed_secs(now).unwrap_or(0),
        });

    let mut pending: Vec<&Task> = all
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .collect();
    pending.sort_by_key(|t| (t.priority, t.created_at));
    let pending_preview = pending
        .iter()
        .take(PREVIEW_LIMIT)
        .enumerate()
        .map(|(position, t)| PendingPreview {
            task: (*t).clone(),
            eta_secs: eta_for_position(position),
        })
        .collect();

    let mut terminal: Vec<&Task> = all.iter().filter(|t| t.status.is_terminal()).collect();
    terminal.sort_by_key(|t| std::cmp::Reverse(t.completed_at.unwrap_or(t.created_at)));
    let recent = terminal
        .iter()
        .take(RECENT_LIMIT)
        .map(|t| (*t).clone())
        .collect();

    let mut filtered: Vec<&Task> = all
        .iter()
        .filter(|t| matches_filter(t, &query.filter))
        .collect();
    filtered.sort_by(|a, b| {
        status_bucket(a.status)
            .cmp(&status_bucket(b.status))
            .then_with(|| match (a.status.is_terminal(), b.status.is_terminal()) {
                (false, false) => (a.priority, a.created_at).cmp(&(b.priority, b.created_at)),
                _ => b
                    .completed_at
                    .unwrap_or(b.created_at)
                    .cmp(&a.completed_at.unwrap_or(a.created_at)),
            })
    });

    let total = filtered.len() as i64;
    let items = filtered
        .into_iter()
        .skip(query.offset() as usize)
        .take(query.page_size as usize)
        .cloned()
        .collect();

    QueueStatus {
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::task::NewTask;

    fn task_with(status: TaskStatus, priority: i32) -> Task {
        let mut task = NewTask::new(
            TaskType::Extract,
            serde_json::json!({"url": "https://x.com/a/status/1"}),
        )
        .with_priority(priority)
        .into_task()
        .unwrap();
        task.status = status;
        if status == TaskStatus::Processing {
            task.started_at = Some(Utc::now());
        }
        if status.is_terminal() {
            task.completed_at = Some(Utc::now());
        }
        task
    }

    #[test]
    fn eta_is_linear_in_queue_position() {
        assert_eq!(eta_for_position(0), ETA_SECS_PER_TASK);
        assert_eq!(eta_for_position(3), 4 * ETA_SECS_PER_TASK);
    }

    #[test]
    fn counts_include_freshly_enqueued_pending() {
        let tasks = vec![task_with(TaskStatus::Pending, 100)];
        let status = assemble(&tasks, &StatusQuery::default(), Utc::now());
        assert_eq!(status.counts.pending, 1);
        assert_eq!(status.counts.processing, 0);
    }

    #[test]
    fn old_terminal_tasks_fall_out_of_the_24h_counts() {
        let mut task = task_with(TaskStatus::Completed, 100);
        task.created_at = Utc::now() - Duration::hours(25);
        let status = assemble(&[task], &StatusQuery::default(), Utc::now());
        assert_eq!(status.counts.completed, 0);
    }

    #[test]
    fn full_list_orders_processing_then_pending_then_terminal() {
        let tasks = vec![
            task_with(TaskStatus::Completed, 100),
            task_with(TaskStatus::Pending, 100),
            task_with(TaskStatus::Processing, 100),
        ];
        let status = assemble(&tasks, &StatusQuery::default(), Utc::now());
        let order: Vec<TaskStatus> = status.tasks.items.iter().map(|t| t.status).collect();
        assert_eq!(
            order,
            vec![TaskStatus::Processing, TaskStatus::Pending, TaskStatus::Completed]
        );
    }

    #[test]
    fn pending_preview_is_ordered_by_priority_then_age() {
        let urgent = task_with(TaskStatus::Pending, 1);
        let normal = task_with(TaskStatus::Pending, 100);
        let status = assemble(
            &[normal.clone(), urgent.clone()],
            &StatusQuery::default(),
            Utc::now(),
        );
        assert_eq!(status.pending_preview[0].task.id, urgent.id);
        assert_eq!(status.pending_preview[1].task.id, normal.id);
        assert_eq!(status.pending_preview[0].eta_secs, ETA_SECS_PER_TASK);
    }

    #[test]
    fn filter_narrows_the_full_list_only() {
        let tasks = vec![
            task_with(TaskStatus::Pending, 100),
            task_with(TaskStatus::Completed, 100),
        ];
        let query = StatusQuery {
            filter: StatusFilter {
                status: Some(TaskStatus::Completed),
                task_type: None,
            },
            ..Default::default()
        };
        let status = assemble(&tasks, &query, Utc::now());
        assert_eq!(status.tasks.total, 1);
        assert_eq!(status.tasks.items[0].status, TaskStatus::Completed);
        // counts still see everything
        assert_eq!(status.counts.pending, 1);
    }
}
