//! Task handlers.
//!
//! One handler per task type, dispatched through [`HandlerRegistry`]. The
//! registry is keyed by the closed [`TaskType`] enum, so the set of runnable
//! work is checked at compile time; a type without a registration is an
//! explicit terminal failure at dispatch.

mod extract;
mod summary;
mod tag;
mod translate;

pub use extract::ExtractHandler;
pub use summary::SummaryHandler;
pub use tag::{TagHandler, TagResponse};
pub use translate::TranslateHandler;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::deps::Deps;
use crate::error::TaskError;
use crate::tasks::{Task, TaskType};

/// What a handler produced.
#[derive(Debug)]
pub enum HandlerOutput {
    /// An extraction record was persisted; its id becomes the result ref.
    Extraction { id: Uuid, item_count: usize },
    /// An opaque result payload to store against the task.
    Payload(serde_json::Value),
}

/// A single unit of task execution.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(&self, task: &Task, deps: &Deps) -> Result<HandlerOutput, TaskError>;
}

/// Maps task types to their handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskType, Box<dyn TaskHandler>>,
}

impl HandlerRegistry {
    /// An empty registry. Dispatching any task through it fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full built-in handler set.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(TaskType::Extract, Box::new(ExtractHandler));
        registry.register(TaskType::Translate, Box::new(TranslateHandler));
        registry.register(TaskType::Tag, Box::new(TagHandler));
        registry.register(TaskType::Summary, Box::new(SummaryHandler));
        registry
    }

    pub fn register(&mut self, task_type: TaskType, handler: Box<dyn TaskHandler>) {
        self.handlers.insert(task_type, handler);
    }

    pub fn resolve(&self, task_type: TaskType) -> Option<&dyn TaskHandler> {
        self.handlers.get(&task_type).map(Box::as_ref)
    }

    pub fn is_registered(&self, task_type: TaskType) -> bool {
        self.handlers.contains_key(&task_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_every_task_type() {
        let registry = HandlerRegistry::builtin();
        for task_type in TaskType::ALL {
            assert!(registry.is_registered(task_type), "{:?}", task_type);
        }
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = HandlerRegistry::new();
        assert!(registry.resolve(TaskType::Extract).is_none());
    }
}
