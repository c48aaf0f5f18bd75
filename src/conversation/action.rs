//! The action algebra folded by the conversation reducer.
//!
//! Actions are the only way conversation state changes. The live session
//! controller and the replay engine both translate wire events into these
//! actions, so a live run and a replayed log walk the exact same code.

use chrono::{DateTime, Utc};

use crate::api::{SubStep, ToolCallCompletePayload};

use super::message::{Message, RunMeta, ToolCall};

/// One state transition of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationAction {
    /// Append an immutable user turn.
    AddUserMessage {
        id: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
    /// Append a fresh assistant turn (no content, no tool calls, pending).
    AddAssistantMessage {
        id: String,
        timestamp: DateTime<Utc>,
    },
    /// Append a started tool call to the named assistant message.
    ToolCallStart {
        message_id: String,
        tool_call: ToolCall,
    },
    /// Merge a completion patch into one tool call, matched by id.
    ToolCallComplete {
        message_id: String,
        tool_call_id: String,
        patch: ToolCallPatch,
    },
    /// Append streamed text to the assistant message's preview content.
    MessageDelta { message_id: String, text: String },
    /// Set the authoritative final content and complete the message.
    MessageComplete { message_id: String, text: String },
    /// Terminal: the run finished; attach its summary.
    RunComplete {
        message_id: String,
        meta: RunMeta,
    },
    /// Terminal: the producer reported a run failure.
    Error {
        message_id: String,
        message: String,
    },
    /// Update the transient status line of the open assistant message.
    Status {
        message_id: String,
        message: String,
    },
    /// Terminal: the user aborted the run locally.
    Cancelled { message_id: String },
    /// Wholesale transcript replacement. Used only by the replay engine.
    SetMessages(Vec<Message>),
    /// Point the conversation at a session (or detach it).
    SetSession(Option<String>),
    /// Flip the live-run flag.
    SetRunning(bool),
    /// Drop the transcript and stop the run flag.
    Clear,
}

/// Patch merged into a tool call by [`ConversationAction::ToolCallComplete`].
///
/// `None` fields leave the started call's values in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallPatch {
    pub duration: Option<String>,
    pub response: Option<String>,
    pub error: Option<String>,
    pub visualizations: Option<Vec<serde_json::Value>>,
    pub sub_steps: Option<Vec<SubStep>>,
    pub action: Option<serde_json::Value>,
}

impl From<ToolCallCompletePayload> for ToolCallPatch {
    fn from(payload: ToolCallCompletePayload) -> Self {
        // `is_action` is a wire hint for renderers; the patch carries the
        // action payload itself.
        Self {
            duration: payload.duration,
            response: payload.response,
            error: payload.error,
            visualizations: payload.visualizations,
            sub_steps: payload.sub_steps,
            action: payload.action,
        }
    }
}
