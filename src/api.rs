//! Shared wire types for the war-room backend.
//!
//! These types define the contract between the backend and this client:
//! session CRUD payloads, the persisted event-log record shape, and the
//! SSE event vocabulary of a live investigation run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ID Prefixes
// ============================================================================

/// ID prefix for sessions.
pub const SESSION_ID_PREFIX: &str = "session_";

/// ID prefix for conversation messages.
pub const MESSAGE_ID_PREFIX: &str = "msg_";

// ============================================================================
// SSE Event Names
// ============================================================================

/// SSE event type names used in run streams and persisted event logs.
pub mod sse {
    pub const USER_MESSAGE: &str = "user_message";
    pub const RUN_START: &str = "run.start";
    pub const TOOL_CALL_START: &str = "tool_call.start";
    pub const TOOL_CALL_COMPLETE: &str = "tool_call.complete";
    pub const MESSAGE_DELTA: &str = "message.delta";
    pub const MESSAGE_COMPLETE: &str = "message.complete";
    pub const RUN_COMPLETE: &str = "run.complete";
    pub const ERROR: &str = "error";
    pub const STATUS: &str = "status";
}

// ============================================================================
// Run Event Payloads
// ============================================================================

/// Payload of a `user_message` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessagePayload {
    pub text: String,
}

/// Payload of a `tool_call.start` event.
///
/// `id` is the producer-assigned identity of the tool call; completion
/// events are matched against it, never against list position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallStartPayload {
    pub id: String,
    pub step: u32,
    pub agent: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Payload of a `tool_call.complete` event.
///
/// Every field except `id` is a patch: absent fields leave the started
/// tool call untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallCompletePayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualizations: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_steps: Option<Vec<SubStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_action: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<serde_json::Value>,
}

/// One fine-grained internal action of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubStep {
    pub index: u32,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Payload of a `message.delta` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDeltaPayload {
    pub text: String,
}

/// Payload of a `message.complete` event.
///
/// `text` is authoritative final content; accumulated deltas are only a
/// streaming preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCompletePayload {
    pub text: String,
}

/// Payload of a `run.complete` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCompletePayload {
    pub steps: u32,
    pub time: String,
}

/// Payload of an `error` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Payload of a `status` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub message: String,
}

// ============================================================================
// Run Events
// ============================================================================

/// A decoded run event: one SSE record or one persisted log record.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    UserMessage(UserMessagePayload),
    RunStart,
    ToolCallStart(ToolCallStartPayload),
    ToolCallComplete(ToolCallCompletePayload),
    MessageDelta(MessageDeltaPayload),
    MessageComplete(MessageCompletePayload),
    RunComplete(RunCompletePayload),
    Error(ErrorPayload),
    Status(StatusPayload),
}

impl RunEvent {
    /// Decode an event from its wire name and JSON payload.
    ///
    /// Returns `Ok(None)` for event types this client does not know, so
    /// newer producers never break older clients. A recognized event with
    /// a malformed payload is an `Err` and the caller decides whether to
    /// skip it.
    pub fn parse(event_type: &str, data: &str) -> Result<Option<RunEvent>, serde_json::Error> {
        let event = match event_type {
            sse::USER_MESSAGE => RunEvent::UserMessage(serde_json::from_str(data)?),
            sse::RUN_START => RunEvent::RunStart,
            sse::TOOL_CALL_START => RunEvent::ToolCallStart(serde_json::from_str(data)?),
            sse::TOOL_CALL_COMPLETE => RunEvent::ToolCallComplete(serde_json::from_str(data)?),
            sse::MESSAGE_DELTA => RunEvent::MessageDelta(serde_json::from_str(data)?),
            sse::MESSAGE_COMPLETE => RunEvent::MessageComplete(serde_json::from_str(data)?),
            sse::RUN_COMPLETE => RunEvent::RunComplete(serde_json::from_str(data)?),
            sse::ERROR => RunEvent::Error(serde_json::from_str(data)?),
            sse::STATUS => RunEvent::Status(serde_json::from_str(data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::RunComplete(_) | RunEvent::Error(_))
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session created, run not yet streaming.
    Pending,
    /// Run in progress, event log still growing.
    Running,
    /// Run finished successfully; event log is frozen.
    Completed,
    /// Run ended with a producer-reported error; event log is frozen.
    Failed,
    /// Run was cancelled; event log is frozen.
    Cancelled,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Failed => write!(f, "failed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Summary of a session in list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub scenario: String,
    pub alert_text: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

/// Full session state, including the persisted event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub id: String,
    pub scenario: String,
    pub alert_text: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub event_log: Vec<EventRecord>,
}

impl SessionDetail {
    /// Summary view of this session.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            scenario: self.scenario.clone(),
            alert_text: self.alert_text.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// One persisted event-log record.
///
/// The payload is kept as the serialized JSON string it was stored with.
/// Decoding happens per record at replay time, so one corrupt payload
/// cannot fail deserialization of the whole session document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_type: String,
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    /// Create a record from an event name and serialized payload.
    pub fn new(
        event_type: impl Into<String>,
        payload: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            payload: payload.into(),
            timestamp,
        }
    }
}

// ============================================================================
// Requests / Responses
// ============================================================================

/// Request to create a new session and start its run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub scenario: String,
    pub alert_text: String,
}

/// Response for session creation.
///
/// `stream_url` is the transport handle for the run that was just kicked
/// off; creation returns immediately, the run streams separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub stream_url: String,
}

/// Response for listing sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionSummary>,
}
