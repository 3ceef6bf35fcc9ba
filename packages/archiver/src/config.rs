use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::scrape::ScrollConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub browserd_url: String,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub poll_interval_secs: u64,
    pub worker_id: Option<String>,
    pub scroll_max_steps: u32,
    pub scroll_presses_per_step: u32,
    pub scroll_settle_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            browserd_url: env::var("BROWSERD_URL")
                .unwrap_or_else(|_| "http://localhost:9321".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("POLL_INTERVAL_SECS must be a valid number")?,
            worker_id: env::var("WORKER_ID").ok(),
            scroll_max_steps: env::var("SCROLL_MAX_STEPS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("SCROLL_MAX_STEPS must be a valid number")?,
            scroll_presses_per_step: env::var("SCROLL_PRESSES_PER_STEP")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("SCROLL_PRESSES_PER_STEP must be a valid number")?,
            scroll_settle_ms: env::var("SCROLL_SETTLE_MS")
                .unwrap_or_else(|_| "1200".to_string())
                .parse()
                .context("SCROLL_SETTLE_MS must be a valid number")?,
        })
    }

    /// Scroll-engine defaults derived from this configuration.
    pub fn scroll_config(&self) -> ScrollConfig {
        ScrollConfig {
            max_steps: self.scroll_max_steps,
            presses_per_step: self.scroll_presses_per_step,
            settle_ms: self.scroll_settle_ms,
            ..Default::default()
        }
    }
}
