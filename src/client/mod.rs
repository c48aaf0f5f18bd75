//! HTTP client for the war-room backend.
//!
//! Provides `BackendClient` for session CRUD and for opening the SSE run
//! stream. CRUD calls carry a per-request timeout; the run stream does not,
//! because a healthy investigation can stay quiet for a long time between
//! events.

mod error;
mod stream;

pub use error::{ClientError, Result};

pub use stream::RunRecordStream;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::api::{
    CreateSessionRequest, CreateSessionResponse, ListSessionsResponse, SessionDetail,
    SessionSummary,
};

/// HTTP client for the war-room backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    request_timeout: Duration,
    http: Client,
}

impl BackendClient {
    /// Create a new client pointing to the given base URL.
    ///
    /// Example: `BackendClient::new("http://localhost:8080", Duration::from_secs(10))`
    #[must_use]
    pub fn new(base_url: &str, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            http: Client::new(),
        }
    }

    // ----------------------------------------------------------------------------
    // Sessions
    // ----------------------------------------------------------------------------

    /// List all sessions, newest first as the backend orders them.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let url = format!("{}/api/v1/sessions", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if response.status().is_success() {
            let body: ListSessionsResponse = response.json().await?;
            Ok(body.sessions)
        } else {
            Err(self.parse_error(response).await)
        }
    }

    /// Create a session and kick off its investigation run.
    ///
    /// Returns as soon as the backend has registered the session; the run
    /// itself streams from the returned `stream_url`.
    pub async fn create_session(
        &self,
        scenario: &str,
        alert_text: &str,
    ) -> Result<CreateSessionResponse> {
        let url = format!("{}/api/v1/sessions", self.base_url);
        let body = CreateSessionRequest {
            scenario: scenario.to_string(),
            alert_text: alert_text.to_string(),
        };

        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await?;
        self.json_response(response).await
    }

    /// Get a session with its persisted event log.
    pub async fn get_session(&self, session_id: &str) -> Result<SessionDetail> {
        let url = format!("{}/api/v1/sessions/{}", self.base_url, session_id);
        let response = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        self.json_response(response).await
    }

    /// Delete a session.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let url = format!("{}/api/v1/sessions/{}", self.base_url, session_id);
        let response = self
            .http
            .delete(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.parse_error(response).await)
        }
    }

    // ----------------------------------------------------------------------------
    // Run stream
    // ----------------------------------------------------------------------------

    /// Open the SSE run stream behind a `stream_url`.
    ///
    /// `stream_url` is taken as the backend returned it: absolute URLs are
    /// used verbatim, paths are joined onto the client's base URL. The
    /// stream yields raw SSE records; decoding them into run events is the
    /// caller's concern.
    pub async fn open_run_stream(&self, stream_url: &str) -> Result<RunRecordStream> {
        let url = self.resolve_url(stream_url);
        let response = self.http.get(&url).send().await?;

        if response.status().is_success() {
            Ok(stream::into_record_stream(response))
        } else {
            Err(self.parse_error(response).await)
        }
    }

    // ----------------------------------------------------------------------------
    // Helpers
    // ----------------------------------------------------------------------------

    fn resolve_url(&self, path_or_url: &str) -> String {
        if path_or_url.contains("://") {
            path_or_url.to_string()
        } else if path_or_url.starts_with('/') {
            format!("{}{}", self.base_url, path_or_url)
        } else {
            format!("{}/{}", self.base_url, path_or_url)
        }
    }

    /// Parse an error response into a ClientError.
    async fn parse_error(&self, response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();

        // Try to parse as problem+json
        if let Ok(problem) = response.json::<ProblemDetails>().await {
            ClientError::Api {
                status,
                message: problem.detail.unwrap_or(problem.title),
            }
        } else {
            ClientError::Api {
                status,
                message: format!("HTTP {}", status),
            }
        }
    }

    /// Parse a successful JSON response or convert error response.
    async fn json_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.parse_error(response).await)
        }
    }
}

/// RFC 7807 Problem Details response.
#[derive(Deserialize)]
struct ProblemDetails {
    title: String,
    detail: Option<String>,
}
