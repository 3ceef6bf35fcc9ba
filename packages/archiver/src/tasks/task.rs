//! Task model for queued archive work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use url::Url;
use uuid::Uuid;

use crate::error::TaskError;

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle states of a task.
///
/// Transitions are monotonic: `pending → processing → {completed, failed,
/// cancelled}`, with `pending → cancelled` as the only allowed skip. No state
/// ever reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal states are never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether moving from `self` to `next` respects the state machine.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

/// Closed set of work the queue knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Extract,
    Translate,
    Tag,
    Summary,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Extract,
        TaskType::Translate,
        TaskType::Tag,
        TaskType::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Extract => "extract",
            TaskType::Translate => "translate",
            TaskType::Tag => "tag",
            TaskType::Summary => "summary",
        }
    }
}

/// Kind tag for rows in `task_results`.
///
/// Non-extract handlers persist their whole payload here; extract tasks
/// instead point at an extraction record via `result_ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Translation,
    Tags,
    Summary,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Translation => "translation",
            ResultKind::Tags => "tags",
            ResultKind::Summary => "summary",
        }
    }

    /// The result kind a task of the given type produces, if it stores one.
    pub fn for_task_type(task_type: TaskType) -> Option<ResultKind> {
        match task_type {
            TaskType::Extract => None,
            TaskType::Translate => Some(ResultKind::Translation),
            TaskType::Tag => Some(ResultKind::Tags),
            TaskType::Summary => Some(ResultKind::Summary),
        }
    }
}

// ============================================================================
// Task model
// ============================================================================

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Task {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub task_type: TaskType,

    /// Opaque serialized parameters; decode with [`Task::params`].
    #[builder(default = serde_json::json!({}))]
    pub params: serde_json::Value,

    #[builder(default)]
    pub status: TaskStatus,

    /// Lower number = more urgent.
    #[builder(default = 100)]
    pub priority: i32,

    #[builder(default = 0)]
    pub progress: i32,
    #[builder(default, setter(strip_option))]
    pub progress_message: Option<String>,

    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,
    #[builder(default, setter(strip_option))]
    pub result_ref: Option<String>,

    #[builder(default, setter(strip_option))]
    pub worker_id: Option<String>,
    #[builder(default, setter(strip_option))]
    pub user_id: Option<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default, setter(strip_option))]
    pub started_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Decode this task's parameter blob into its typed form.
    pub fn params(&self) -> Result<TaskParams, TaskError> {
        TaskParams::decode(self.task_type, &self.params)
    }

    /// Seconds spent in `processing` so far, if started.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.started_at.map(|started| (now - started).num_seconds())
    }
}

// ============================================================================
// Typed parameters
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractParams {
    /// Feed or status URL to drive the page session against.
    pub url: String,
    /// Override for the scroll-step ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    /// Optional cap on collected items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslateParams {
    pub extraction_id: Uuid,
    /// Target language; defaults to English when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagParams {
    pub extraction_id: Uuid,
    /// Closed controlled vocabulary the model must choose from.
    pub vocabulary: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummaryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_id: Option<Uuid>,
}

/// Legacy flat blob written by early callers: no `params` wrapper, just
/// url + scroll count at the top level. Always meant an extract task.
#[derive(Debug, Deserialize)]
struct LegacyExtract {
    url: String,
    #[serde(default, alias = "scrollCount")]
    scroll_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskParams {
    Extract(ExtractParams),
    Translate(TranslateParams),
    Tag(TagParams),
    Summary(SummaryParams),
}

impl TaskParams {
    /// Decode a stored parameter blob.
    ///
    /// The current shape wraps the typed object under a `params` key. A blob
    /// without that key is the legacy untagged shape and decodes as an
    /// implicit extract task built from its url/scroll-count fields.
    pub fn decode(task_type: TaskType, raw: &serde_json::Value) -> Result<Self, TaskError> {
        if let Some(inner) = raw.get("params") {
            return Self::decode_typed(task_type, inner);
        }

        let legacy: LegacyExtract = serde_json::from_value(raw.clone()).map_err(|_| {
            TaskError::Validation(format!(
                "params blob has no `params` object and no legacy url field: {}",
                raw
            ))
        })?;

        Ok(TaskParams::Extract(ExtractParams {
            url: legacy.url,
            max_steps: legacy.scroll_count,
            max_items: None,
        }))
    }

    fn decode_typed(task_type: TaskType, inner: &serde_json::Value) -> Result<Self, TaskError> {
        let params = match task_type {
            TaskType::Extract => TaskParams::Extract(serde_json::from_value(inner.clone())?),
            TaskType::Translate => TaskParams::Translate(serde_json::from_value(inner.clone())?),
            TaskType::Tag => TaskParams::Tag(serde_json::from_value(inner.clone())?),
            TaskType::Summary => TaskParams::Summary(serde_json::from_value(inner.clone())?),
        };
        Ok(params)
    }

    pub fn task_type(&self) -> TaskType {
        match self {
            TaskParams::Extract(_) => TaskType::Extract,
            TaskParams::Translate(_) => TaskType::Translate,
            TaskParams::Tag(_) => TaskType::Tag,
            TaskParams::Summary(_) => TaskType::Summary,
        }
    }
}

// ============================================================================
// Enqueue input
// ============================================================================

/// Input for creating a new task row.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_type: TaskType,
    /// The typed parameter object (unwrapped); stored as `{"params": ...}`.
    pub params: serde_json::Value,
    pub priority: Option<i32>,
    pub user_id: Option<String>,
}

impl NewTask {
    pub fn new(task_type: TaskType, params: serde_json::Value) -> Self {
        Self {
            task_type,
            params,
            priority: None,
            user_id: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Validate the input and produce the typed params it decodes to.
    ///
    /// Rejects unknown shapes, unparseable URLs, and empty tag vocabularies
    /// before any row is written.
    pub fn validate(&self) -> Result<TaskParams, TaskError> {
        let blob = serde_json::json!({ "params": self.params });
        let params = TaskParams::decode(self.task_type, &blob)?;

        match &params {
            TaskParams::Extract(p) => {
                Url::parse(&p.url)
                    .map_err(|e| TaskError::Validation(format!("invalid url {:?}: {}", p.url, e)))?;
            }
            TaskParams::Tag(p) => {
                if p.vocabulary.is_empty() {
                    return Err(TaskError::Validation(
                        "tag task requires a non-empty vocabulary".into(),
                    ));
                }
            }
            TaskParams::Translate(_) | TaskParams::Summary(_) => {}
        }

        Ok(params)
    }

    /// Build the `pending` task row this input inserts.
    pub fn into_task(self) -> Result<Task, TaskError> {
        self.validate()?;
        let mut task = Task::builder()
            .task_type(self.task_type)
            .params(serde_json::json!({ "params": self.params }))
            .priority(self.priority.unwrap_or(100))
            .build();
        task.user_id = self.user_id;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_input() -> NewTask {
        NewTask::new(
            TaskType::Extract,
            serde_json::json!({"url": "https://x.com/someone/status/1"}),
        )
    }

    #[test]
    fn new_task_starts_pending_with_default_priority() {
        let task = extract_input().into_task().unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, 100);
        assert_eq!(task.progress, 0);
    }

    #[test]
    fn priority_override_is_kept() {
        let task = extract_input().with_priority(5).into_task().unwrap();
        assert_eq!(task.priority, 5);
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        use TaskStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Processing));
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn typed_params_round_trip() {
        let task = extract_input().into_task().unwrap();
        match task.params().unwrap() {
            TaskParams::Extract(p) => {
                assert_eq!(p.url, "https://x.com/someone/status/1");
                assert_eq!(p.max_steps, None);
            }
            other => panic!("expected extract params, got {:?}", other),
        }
    }

    #[test]
    fn legacy_flat_blob_decodes_as_extract() {
        let raw = serde_json::json!({"url": "https://x.com/a/status/2", "scrollCount": 12});
        let params = TaskParams::decode(TaskType::Extract, &raw).unwrap();
        assert_eq!(
            params,
            TaskParams::Extract(ExtractParams {
                url: "https://x.com/a/status/2".into(),
                max_steps: Some(12),
                max_items: None,
            })
        );
    }

    #[test]
    fn legacy_snake_case_scroll_count_also_decodes() {
        let raw = serde_json::json!({"url": "https://x.com/a/status/3", "scroll_count": 4});
        match TaskParams::decode(TaskType::Extract, &raw).unwrap() {
            TaskParams::Extract(p) => assert_eq!(p.max_steps, Some(4)),
            other => panic!("expected extract params, got {:?}", other),
        }
    }

    #[test]
    fn blob_without_params_or_url_is_rejected() {
        let raw = serde_json::json!({"something": "else"});
        let err = TaskParams::decode(TaskType::Extract, &raw).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn invalid_url_is_rejected_before_insert() {
        let input = NewTask::new(TaskType::Extract, serde_json::json!({"url": "not a url"}));
        assert!(input.validate().unwrap_err().is_validation());
    }

    #[test]
    fn empty_tag_vocabulary_is_rejected() {
        let input = NewTask::new(
            TaskType::Tag,
            serde_json::json!({
                "extraction_id": Uuid::new_v4(),
                "vocabulary": []
            }),
        );
        assert!(input.validate().unwrap_err().is_validation());
    }

    #[test]
    fn result_kind_matches_task_type() {
        assert_eq!(ResultKind::for_task_type(TaskType::Extract), None);
        assert_eq!(
            ResultKind::for_task_type(TaskType::Translate),
            Some(ResultKind::Translation)
        );
        assert_eq!(ResultKind::for_task_type(TaskType::Tag), Some(ResultKind::Tags));
        assert_eq!(
            ResultKind::for_task_type(TaskType::Summary),
            Some(ResultKind::Summary)
        );
    }
}
