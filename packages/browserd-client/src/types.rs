//! Request and response types for the browserd HTTP API.

use serde::{Deserialize, Serialize};

/// Handle for a page session held open by the automation service.
///
/// Obtained from [`crate::BrowserdClient::open_page`]; must eventually be
/// passed to [`crate::BrowserdClient::close_page`], which consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSession {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenPageRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenPageResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotResponse {
    pub html: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PressKeyRequest<'a> {
    pub key: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct WaitRequest {
    pub ms: u64,
}
