//! Queue behavior tests: claim exclusivity, transition monotonicity, and
//! status visibility, run against the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use archiver_core::tasks::MemoryTaskStore;
use archiver_core::{NewTask, StatusQuery, TaskStatus, TaskStore, TaskType};
use uuid::Uuid;

fn extract_input() -> NewTask {
    NewTask::new(
        TaskType::Extract,
        serde_json::json!({"url": "https://x.com/someone/status/1"}),
    )
}

#[tokio::test]
async fn concurrent_workers_claim_each_task_exactly_once() {
    const TASKS: usize = 40;
    const WORKERS: usize = 8;

    let store = Arc::new(MemoryTaskStore::new());
    let mut enqueued = HashSet::new();
    for _ in 0..TASKS {
        enqueued.insert(store.enqueue(extract_input()).await.unwrap());
    }

    let mut handles = Vec::new();
    for worker in 0..WORKERS {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let worker_id = format!("worker-{}", worker);
            let mut claimed = Vec::new();
            while let Some(task) = store.claim(&worker_id).await.unwrap() {
                assert_eq!(task.status, TaskStatus::Processing);
                assert_eq!(task.worker_id.as_deref(), Some(worker_id.as_str()));
                claimed.push(task.id);
                tokio::task::yield_now().await;
            }
            claimed
        }));
    }

    let mut all_claimed: Vec<Uuid> = Vec::new();
    for handle in handles {
        all_claimed.extend(handle.await.unwrap());
    }

    // no double-claim, no starvation
    assert_eq!(all_claimed.len(), TASKS);
    let unique: HashSet<Uuid> = all_claimed.iter().copied().collect();
    assert_eq!(unique, enqueued);
}

#[tokio::test]
async fn statuses_never_revert() {
    let store = MemoryTaskStore::new();
    let id = store.enqueue(extract_input()).await.unwrap();

    store.claim("w1").await.unwrap().unwrap();
    store.complete(id, "ref").await.unwrap();
    assert_eq!(
        store.get(id).await.unwrap().unwrap().status,
        TaskStatus::Completed
    );

    // terminal: cancel and fail are no-ops
    assert!(!store.cancel(id).await.unwrap());
    store.fail(id, "late error").await.unwrap();
    let task = store.get(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.error_message, None);
}

#[tokio::test]
async fn pending_may_skip_straight_to_cancelled() {
    let store = MemoryTaskStore::new();
    let id = store.enqueue(extract_input()).await.unwrap();

    assert!(store.cancel(id).await.unwrap());
    assert_eq!(
        store.get(id).await.unwrap().unwrap().status,
        TaskStatus::Cancelled
    );

    // a cancelled task is no longer claimable
    assert!(store.claim("w1").await.unwrap().is_none());
}

#[tokio::test]
async fn cancel_of_processing_is_cooperative() {
    let store = MemoryTaskStore::new();
    let id = store.enqueue(extract_input()).await.unwrap();
    store.claim("w1").await.unwrap().unwrap();

    assert!(store.cancel(id).await.unwrap());
    // the worker's late completion does not resurrect the task
    store.complete(id, "ref").await.unwrap();
    assert_eq!(
        store.get(id).await.unwrap().unwrap().status,
        TaskStatus::Cancelled
    );
}

#[tokio::test]
async fn enqueue_is_immediately_visible_in_status() {
    let store = MemoryTaskStore::new();
    let id = store.enqueue(extract_input()).await.unwrap();

    let status = store.status(StatusQuery::default()).await.unwrap();
    assert_eq!(status.counts.pending, 1);
    assert_eq!(status.counts.processing, 0);
    assert!(status.pending_preview.iter().any(|p| p.task.id == id));
    assert!(status.current.is_none());
}

#[tokio::test]
async fn status_tracks_the_processing_task_and_recents() {
    let store = MemoryTaskStore::new();
    let done = store.enqueue(extract_input()).await.unwrap();
    store.claim("w1").await.unwrap().unwrap();
    store.fail(done, "boom").await.unwrap();

    let running = store.enqueue(extract_input()).await.unwrap();
    store.claim("w1").await.unwrap().unwrap();

    let status = store.status(StatusQuery::default()).await.unwrap();
    let current = status.current.unwrap();
    assert_eq!(current.task.id, running);
    assert!(current.elapsed_secs >= 0);
    assert_eq!(status.recent.len(), 1);
    assert_eq!(status.recent[0].id, done);
    assert_eq!(
        status.recent[0].error_message.as_deref(),
        Some("boom")
    );
}

#[tokio::test]
async fn full_list_pagination_and_filtering() {
    let store = MemoryTaskStore::new();
    for _ in 0..5 {
        store.enqueue(extract_input()).await.unwrap();
    }
    let tagged = store
        .enqueue(NewTask::new(
            TaskType::Tag,
            serde_json::json!({"extraction_id": Uuid::new_v4(), "vocabulary": ["tech"]}),
        ))
        .await
        .unwrap();

    let page = store
        .status(StatusQuery {
            page: 1,
            page_size: 4,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.tasks.total, 6);
    assert_eq!(page.tasks.items.len(), 4);

    let filtered = store
        .status(StatusQuery {
            filter: archiver_core::StatusFilter {
                status: None,
                task_type: Some(TaskType::Tag),
            },
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(filtered.tasks.total, 1);
    assert_eq!(filtered.tasks.items[0].id, tagged);
}

#[tokio::test]
async fn validation_failures_leave_no_row() {
    let store = MemoryTaskStore::new();
    let err = store
        .enqueue(NewTask::new(
            TaskType::Extract,
            serde_json::json!({"url": "not a url"}),
        ))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let status = store.status(StatusQuery::default()).await.unwrap();
    assert_eq!(status.tasks.total, 0);
}
