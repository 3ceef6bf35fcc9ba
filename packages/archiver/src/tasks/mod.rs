//! Task queue infrastructure.
//!
//! - [`Task`] — the durable work item model
//! - [`TaskStore`] — queue operations (enqueue, atomic claim, transitions,
//!   status views, sweep) with the PostgreSQL implementation
//! - [`MemoryTaskStore`] — in-memory double for tests
//!
//! Status transitions are monotonic and the claim is the only
//! synchronization point between worker instances.

mod status;
mod store;
mod task;
pub mod testing;

pub use status::{
    PendingPreview, ProcessingSnapshot, QueueStatus, StatusCounts, StatusFilter, StatusQuery,
    TaskPage, ETA_SECS_PER_TASK,
};
pub use store::{PgTaskStore, TaskStore};
pub use task::{
    ExtractParams, NewTask, ResultKind, SummaryParams, TagParams, Task, TaskParams, TaskStatus,
    TaskType, TranslateParams,
};
pub use testing::MemoryTaskStore;
