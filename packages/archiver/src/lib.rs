// Magpie - tweet archive core
//
// The asynchronous engine behind the archive: a durable task queue over
// PostgreSQL, a polling processor that dispatches typed handlers, an
// incremental scroll-scrape engine driven against a remote browser
// automation service, and the deterministic Markdown formatter for
// extracted threads.
//
// The surrounding product (REST edge, views, tag tables) consumes this
// crate by enqueueing tasks, polling status, and reading extraction
// records.

pub mod config;
pub mod deps;
pub mod error;
pub mod format;
pub mod handlers;
pub mod llm;
pub mod processor;
pub mod records;
pub mod scrape;
pub mod tasks;
pub mod testing;

pub use config::Config;
pub use deps::{BrowserdAdapter, Deps};
pub use error::TaskError;
pub use handlers::{HandlerOutput, HandlerRegistry, TaskHandler};
pub use llm::{first_json_object, Completion, DEFAULT_MODEL};
pub use processor::{Processor, ProcessorConfig};
pub use records::{ExtractionRecord, ExtractionStore, NewExtraction, PgExtractionStore};
pub use scrape::{
    BrowserAutomation, FollowingCollector, KeylessPolicy, PageCollector, PageHandle, ScrollConfig,
    ScrollEngine, SessionResult, Snapshot, ThreadCollector, Tweet,
};
pub use tasks::{
    NewTask, PgTaskStore, QueueStatus, ResultKind, StatusFilter, StatusQuery, Task, TaskParams,
    TaskStatus, TaskStore, TaskType,
};
