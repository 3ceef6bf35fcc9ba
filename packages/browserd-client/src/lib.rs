//! Pure browserd REST API client.
//!
//! A minimal client for the browserd page-automation service. browserd holds
//! real browser pages open server-side; this client opens a page session,
//! takes DOM snapshots, sends scroll key presses, and closes the session.
//!
//! Every session opened through this client must eventually be closed —
//! [`BrowserdClient::close_page`] consumes the [`PageSession`] so a closed
//! handle cannot be reused.
//!
//! # Example
//!
//! ```rust,ignore
//! use browserd_client::BrowserdClient;
//!
//! let client = BrowserdClient::new("http://localhost:9321");
//!
//! let session = client.open_page("https://x.com/someone/status/1").await?;
//! let html = client.snapshot(&session).await?;
//! client.press_key(&session, "PageDown").await?;
//! client.wait(&session, 1200).await?;
//! client.close_page(session).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{BrowserdError, Result};
pub use types::PageSession;

use tracing::debug;

use types::{OpenPageRequest, OpenPageResponse, PressKeyRequest, SnapshotResponse, WaitRequest};

pub struct BrowserdClient {
    client: reqwest::Client,
    base_url: String,
}

impl BrowserdClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Open a remote page and return its session handle.
    pub async fn open_page(&self, url: &str) -> Result<PageSession> {
        debug!(url = %url, "opening page session");
        let resp = self
            .client
            .post(format!("{}/pages", self.base_url))
            .json(&OpenPageRequest { url })
            .send()
            .await?;

        let resp = Self::check_status(resp).await?;
        let opened: OpenPageResponse = resp.json().await?;
        Ok(PageSession { id: opened.session_id })
    }

    /// Take a serialized DOM snapshot of the page as it currently renders.
    pub async fn snapshot(&self, session: &PageSession) -> Result<String> {
        let resp = self
            .client
            .get(format!("{}/pages/{}/snapshot", self.base_url, session.id))
            .send()
            .await?;

        let resp = Self::check_status(resp).await?;
        let snapshot: SnapshotResponse = resp.json().await?;
        Ok(snapshot.html)
    }

    /// Send one scroll key press (PageDown) to the page.
    pub async fn press_key(&self, session: &PageSession, key: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/pages/{}/keys", self.base_url, session.id))
            .json(&PressKeyRequest { key })
            .send()
            .await?;

        Self::check_status(resp).await?;
        Ok(())
    }

    /// Ask the service to let the page settle for `ms` milliseconds.
    pub async fn wait(&self, session: &PageSession, ms: u64) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/pages/{}/wait", self.base_url, session.id))
            .json(&WaitRequest { ms })
            .send()
            .await?;

        Self::check_status(resp).await?;
        Ok(())
    }

    /// Close the page session, releasing the remote browser page.
    ///
    /// Consumes the session handle: once closed it cannot be used again.
    pub async fn close_page(&self, session: PageSession) -> Result<()> {
        debug!(session_id = %session.id, "closing page session");
        let resp = self
            .client
            .delete(format!("{}/pages/{}", self.base_url, session.id))
            .send()
            .await?;

        Self::check_status(resp).await?;
        Ok(())
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let url = resp.url().clone();
        let message = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BrowserdError::SessionNotFound(url.path().to_string()));
        }
        Err(BrowserdError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = BrowserdClient::new("http://localhost:9321/");
        assert_eq!(client.base_url, "http://localhost:9321");
    }
}
