//! Queue worker binary.
//!
//! Wires the Postgres stores, the browserd automation client, and the LLM
//! client into one processor instance and runs it until Ctrl+C. Scale out by
//! starting more workers with distinct `WORKER_ID`s.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use archiver_core::{
    BrowserdAdapter, Config, Deps, HandlerRegistry, PgExtractionStore, PgTaskStore, Processor,
    ProcessorConfig,
};
use browserd_client::BrowserdClient;
use llm_client::LlmClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let browser = BrowserdAdapter::new(Arc::new(BrowserdClient::new(config.browserd_url.clone())));

    let mut llm = LlmClient::new(config.openai_api_key.clone());
    if let Some(base_url) = &config.openai_base_url {
        llm = llm.with_base_url(base_url.clone());
    }

    let deps = Deps::new(
        Arc::new(PgTaskStore::new(pool.clone())),
        Arc::new(PgExtractionStore::new(pool)),
        Arc::new(browser),
        Arc::new(llm),
        config.scroll_config(),
    );

    let mut processor_config = match &config.worker_id {
        Some(worker_id) => ProcessorConfig::with_worker_id(worker_id.as_str()),
        None => ProcessorConfig::default(),
    };
    processor_config.poll_interval = Duration::from_secs(config.poll_interval_secs);

    info!(worker_id = %processor_config.worker_id, "starting archive worker");

    Processor::with_config(deps, HandlerRegistry::builtin(), processor_config)
        .run_until_shutdown()
        .await
}
