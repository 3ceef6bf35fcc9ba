//! Extraction records: the canonical scraped thread.
//!
//! A record is written exactly once, by a successful extract task, and never
//! mutated afterwards. Translations and tags are stored as task results
//! keyed by extraction id, not as changes to the record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::TaskError;
use crate::format;
use crate::scrape::Tweet;

/// How much of the first tweet the denormalized preview keeps.
const PREVIEW_BYTES: usize = 200;

#[derive(FromRow, Debug, Clone)]
pub struct ExtractionRecord {
    pub id: Uuid,
    pub source_url: String,
    pub author_name: String,
    pub author_handle: String,
    pub thread: Json<Vec<Tweet>>,
    pub preview_text: String,
    pub tweet_count: i32,
    pub created_at: DateTime<Utc>,
}

impl ExtractionRecord {
    pub fn tweets(&self) -> &[Tweet] {
        &self.thread.0
    }
}

/// Input for creating a record from a finished scrape session.
#[derive(Debug, Clone)]
pub struct NewExtraction {
    pub source_url: String,
    pub author_name: String,
    pub author_handle: String,
    pub thread: Vec<Tweet>,
    pub preview_text: String,
}

impl NewExtraction {
    /// Build from a collected thread, denormalizing the preview fields from
    /// the first tweet.
    pub fn from_thread(source_url: impl Into<String>, thread: Vec<Tweet>) -> Self {
        let (author_name, author_handle) = thread
            .first()
            .map(|t| (t.author_name.clone(), t.author_handle.clone()))
            .unwrap_or_default();
        let preview_text = thread
            .first()
            .map(|t| {
                format::truncate_content(&format::tweet_to_markdown(t), PREVIEW_BYTES).to_string()
            })
            .unwrap_or_default();

        Self {
            source_url: source_url.into(),
            author_name,
            author_handle,
            thread,
            preview_text,
        }
    }
}

/// Storage for extraction records.
#[async_trait]
pub trait ExtractionStore: Send + Sync {
    /// Insert a new record, returning its generated id.
    async fn insert(&self, new: NewExtraction) -> Result<Uuid, TaskError>;

    /// Fetch a record by id.
    async fn get(&self, id: Uuid) -> Result<Option<ExtractionRecord>, TaskError>;
}

/// PostgreSQL-backed extraction store.
pub struct PgExtractionStore {
    pool: PgPool,
}

impl PgExtractionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExtractionStore for PgExtractionStore {
    async fn insert(&self, new: NewExtraction) -> Result<Uuid, TaskError> {
        let id = Uuid::new_v4();
        let tweet_count = new.thread.len() as i32;

        sqlx::query(
            r#"
            INSERT INTO extractions (
                id, source_url, author_name, author_handle,
                thread, preview_text, tweet_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&new.source_url)
        .bind(&new.author_name)
        .bind(&new.author_handle)
        .bind(Json(&new.thread))
        .bind(&new.preview_text)
        .bind(tweet_count)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ExtractionRecord>, TaskError> {
        let record = sqlx::query_as::<_, ExtractionRecord>(
            r#"
            SELECT id, source_url, author_name, author_handle,
                   thread, preview_text, tweet_count, created_at
            FROM extractions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
