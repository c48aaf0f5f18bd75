//! Renderable conversation state: messages, tool calls, run summaries.
//!
//! These types are what the UI layer draws. They are produced exclusively
//! by folding [`ConversationAction`](super::ConversationAction) values
//! through the reducer, live or in replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::SubStep;

/// One entry in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User(UserMessage),
    Assistant(AssistantMessage),
}

impl Message {
    /// Stable identity of the message.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Message::User(m) => &m.id,
            Message::Assistant(m) => &m.id,
        }
    }

    /// Assistant view of this message, if it is one.
    #[must_use]
    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Message::Assistant(m) => Some(m),
            Message::User(_) => None,
        }
    }
}

/// A user turn. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// An assistant turn: the investigation run it narrates, its tool calls,
/// and its streamed content.
///
/// Mutable while `status` is `Pending` or `Streaming`; frozen once the
/// status is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Tool calls in start order; start order is display order.
    pub tool_calls: Vec<ToolCall>,
    /// Authoritative final content, set by `MessageComplete`.
    pub content: String,
    /// Accumulated delta preview while the run is streaming.
    pub streaming_content: String,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_meta: Option<RunMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Transient status line shown while the run is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl AssistantMessage {
    /// A fresh assistant turn with no content and no tool calls.
    #[must_use]
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            tool_calls: Vec::new(),
            content: String::new(),
            streaming_content: String::new(),
            status: MessageStatus::Pending,
            run_meta: None,
            error_message: None,
            status_message: None,
        }
    }

    /// Whether this message can still be mutated.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    pub(crate) fn tool_call_mut(&mut self, id: &str) -> Option<&mut ToolCall> {
        self.tool_calls.iter_mut().find(|t| t.id == id)
    }
}

/// Lifecycle of an assistant message.
///
/// Transitions are monotonic: `Pending -> Streaming -> terminal`, with no
/// way out of a terminal state. `Cancelled` is deliberately distinct from
/// `Error` so the UI can tell an aborted run from a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Streaming,
    Complete,
    Error,
    Cancelled,
}

impl MessageStatus {
    /// Whether the status admits no further transition.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MessageStatus::Complete | MessageStatus::Error | MessageStatus::Cancelled
        )
    }
}

/// One delegated sub-agent invocation nested under an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Producer-assigned identity; completion is matched against this,
    /// never against position.
    pub id: String,
    /// Monotonic step number within the assistant message.
    pub step: u32,
    /// Display name of the delegated agent.
    pub agent: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub status: ToolCallStatus,
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
    pub action: Option<serde_json::Value>,
}

/// Tool call lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Running,
    Complete,
    Error,
}

impl ToolCallStatus {
    /// Whether the tool call is finished; finished calls freeze their
    /// sub-step lists.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolCallStatus::Complete | ToolCallStatus::Error)
    }
}

/// Run summary attached to an assistant message at completion.
/// Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub steps: u32,
    pub time: String,
}
