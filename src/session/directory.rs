//! The local view of the backend's session list.
//!
//! The directory mirrors the backend's sessions and tracks which one the
//! user is looking at. Deletes are optimistic: the local list is pruned
//! even when the backend call fails, so the UI never resurrects a
//! session the user already dismissed.

use chrono::Utc;
use tracing::{debug, warn};

use crate::api::{CreateSessionResponse, SessionDetail, SessionStatus, SessionSummary};
use crate::client::{BackendClient, Result};

/// Session list plus the active selection.
#[derive(Debug)]
pub struct SessionDirectory {
    client: BackendClient,
    sessions: Vec<SessionSummary>,
    active: Option<String>,
}

impl SessionDirectory {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            sessions: Vec::new(),
            active: None,
        }
    }

    /// Currently known sessions, in backend order.
    #[must_use]
    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    /// Id of the selected session, if any.
    #[must_use]
    pub fn active_session(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Refetch the session list from the backend.
    pub async fn refresh(&mut self) -> Result<&[SessionSummary]> {
        self.sessions = self.client.list_sessions().await?;
        debug!(count = self.sessions.len(), "refreshed session list");
        Ok(&self.sessions)
    }

    /// Create a session and start its investigation run.
    ///
    /// Returns as soon as the backend has accepted the session, while the
    /// run is still streaming. The new session becomes the active one and
    /// appears in the local list immediately as `Running`.
    pub async fn create(
        &mut self,
        scenario: &str,
        alert_text: &str,
    ) -> Result<CreateSessionResponse> {
        let created = self.client.create_session(scenario, alert_text).await?;

        self.sessions.insert(
            0,
            SessionSummary {
                id: created.session_id.clone(),
                scenario: scenario.to_string(),
                alert_text: alert_text.to_string(),
                status: SessionStatus::Running,
                created_at: Utc::now(),
            },
        );
        self.active = Some(created.session_id.clone());
        Ok(created)
    }

    /// Select a session and fetch its full state for replay.
    pub async fn select(&mut self, session_id: &str) -> Result<SessionDetail> {
        let detail = self.client.get_session(session_id).await?;
        self.active = Some(detail.id.clone());
        Ok(detail)
    }

    /// Remove a session.
    ///
    /// The local list is pruned and the active selection cleared before
    /// the backend is asked, so the entry never reappears on failure. A
    /// backend failure is logged and returned, but the local removal
    /// stands.
    pub async fn delete(&mut self, session_id: &str) -> Result<()> {
        self.sessions.retain(|s| s.id != session_id);
        if self.active.as_deref() == Some(session_id) {
            self.active = None;
        }

        if let Err(e) = self.client.delete_session(session_id).await {
            warn!(
                session_id,
                error = %e,
                "backend delete failed; session removed locally only"
            );
            return Err(e);
        }
        Ok(())
    }
}
