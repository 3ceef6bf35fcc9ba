//! Error types for the browserd client.

use thiserror::Error;

/// Result type for browserd client operations.
pub type Result<T> = std::result::Result<T, BrowserdError>;

/// Browserd client errors.
#[derive(Debug, Error)]
pub enum BrowserdError {
    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API error (non-2xx response from the automation service)
    #[error("Browserd API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The service reported a page that no longer exists
    #[error("Page session not found: {0}")]
    SessionNotFound(String),
}
