//! Pure chat-completion REST client.
//!
//! A minimal client for OpenAI-compatible `/chat/completions` endpoints with
//! no domain-specific logic. Supports a custom base URL for proxies and
//! self-hosted gateways.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_client::{ChatRequest, LlmClient, Message};
//!
//! let client = LlmClient::from_env()?;
//!
//! let response = client
//!     .chat_completion(ChatRequest::new("gpt-4o-mini").message(Message::user("Hello!")))
//!     .await?;
//! println!("{}", response.content);
//! ```

pub mod error;
pub mod types;

pub use error::{LlmError, Result};
pub use types::{ChatRequest, ChatResponse, Message};

use reqwest::Client;
use tracing::warn;

use types::ApiChatResponse;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Pure chat-completion API client.
#[derive(Clone)]
pub struct LlmClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    ///
    /// Honors `OPENAI_BASE_URL` when set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::Config("OPENAI_API_KEY not set".into()))?;
        let mut client = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            client = client.with_base_url(base_url);
        }
        Ok(client)
    }

    /// Set a custom base URL (for proxies, gateways, compatible servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Sends the conversation to `/chat/completions` and returns the first
    /// choice's content.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "chat completion request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "chat completion API error");
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let api_response: ApiChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("invalid completion response: {}", e)))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Parse("completion response has no choices".into()))?;

        Ok(ChatResponse {
            content,
            model: api_response.model,
        })
    }
}
