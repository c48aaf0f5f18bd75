//! The conversation state machine.
//!
//! `ConversationState::apply` is a total, synchronous fold step: every
//! action produces a well-defined next state, and actions referencing
//! messages or tool calls that do not resolve are defined no-ops rather
//! than errors. Late or duplicated events from a superseded run must never
//! corrupt unrelated state.
//!
//! Status transitions are monotonic. A terminal message is frozen, with
//! one deliberate exception: `RunComplete` may still attach a missing run
//! summary to a message that `MessageComplete` already closed, because the
//! producer completes the message before it reports the run summary.

use super::action::{ConversationAction, ToolCallPatch};
use super::message::{
    AssistantMessage, Message, MessageStatus, ToolCall, ToolCallStatus, UserMessage,
};

/// The whole renderable conversation.
///
/// `messages` is append-mostly: while a run is active only the last
/// entry mutates in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub running: bool,
    pub active_session_id: Option<String>,
}

impl ConversationState {
    /// Apply one action, stepping the state machine.
    pub fn apply(&mut self, action: ConversationAction) {
        match action {
            ConversationAction::AddUserMessage {
                id,
                text,
                timestamp,
            } => {
                self.close_open_assistant();
                self.messages
                    .push(Message::User(UserMessage { id, text, timestamp }));
            }
            ConversationAction::AddAssistantMessage { id, timestamp } => {
                self.close_open_assistant();
                self.messages
                    .push(Message::Assistant(AssistantMessage::new(id, timestamp)));
            }
            ConversationAction::ToolCallStart {
                message_id,
                tool_call,
            } => {
                let Some(msg) = self.open_assistant_mut(&message_id) else {
                    return;
                };
                msg.tool_calls.push(tool_call);
                msg.status = MessageStatus::Streaming;
            }
            ConversationAction::ToolCallComplete {
                message_id,
                tool_call_id,
                patch,
            } => {
                let Some(msg) = self.open_assistant_mut(&message_id) else {
                    return;
                };
                let Some(call) = msg.tool_call_mut(&tool_call_id) else {
                    return;
                };
                if call.status.is_terminal() {
                    return;
                }
                merge_tool_call_patch(call, patch);
            }
            ConversationAction::MessageDelta { message_id, text } => {
                let Some(msg) = self.open_assistant_mut(&message_id) else {
                    return;
                };
                msg.streaming_content.push_str(&text);
                msg.status = MessageStatus::Streaming;
            }
            ConversationAction::MessageComplete { message_id, text } => {
                let Some(msg) = self.open_assistant_mut(&message_id) else {
                    return;
                };
                msg.content = text;
                msg.streaming_content.clear();
                msg.status_message = None;
                msg.status = MessageStatus::Complete;
            }
            ConversationAction::RunComplete { message_id, meta } => {
                let Some(msg) = self.assistant_mut(&message_id) else {
                    return;
                };
                match msg.status {
                    MessageStatus::Error | MessageStatus::Cancelled => {}
                    MessageStatus::Complete => {
                        // The message closed first (normal producer order);
                        // only the summary is still missing.
                        if msg.run_meta.is_none() {
                            msg.run_meta = Some(meta);
                        }
                    }
                    MessageStatus::Pending | MessageStatus::Streaming => {
                        msg.run_meta = Some(meta);
                        msg.status_message = None;
                        msg.status = MessageStatus::Complete;
                    }
                }
            }
            ConversationAction::Error {
                message_id,
                message,
            } => {
                let Some(msg) = self.open_assistant_mut(&message_id) else {
                    return;
                };
                msg.error_message = Some(message);
                msg.status_message = None;
                msg.status = MessageStatus::Error;
            }
            ConversationAction::Status {
                message_id,
                message,
            } => {
                let Some(msg) = self.open_assistant_mut(&message_id) else {
                    return;
                };
                msg.status_message = Some(message);
            }
            ConversationAction::Cancelled { message_id } => {
                let Some(msg) = self.open_assistant_mut(&message_id) else {
                    return;
                };
                msg.status_message = None;
                msg.status = MessageStatus::Cancelled;
            }
            ConversationAction::SetMessages(messages) => {
                self.messages = messages;
            }
            ConversationAction::SetSession(session_id) => {
                self.active_session_id = session_id;
            }
            ConversationAction::SetRunning(running) => {
                self.running = running;
            }
            ConversationAction::Clear => {
                self.messages.clear();
                self.running = false;
            }
        }
    }

    /// The assistant message with this id, regardless of status.
    fn assistant_mut(&mut self, id: &str) -> Option<&mut AssistantMessage> {
        self.messages.iter_mut().find_map(|m| match m {
            Message::Assistant(msg) if msg.id == id => Some(msg),
            _ => None,
        })
    }

    /// The assistant message with this id, only while it is still open.
    fn open_assistant_mut(&mut self, id: &str) -> Option<&mut AssistantMessage> {
        self.assistant_mut(id).filter(|m| m.is_open())
    }

    /// Force-close a trailing open assistant message before appending a
    /// new turn. Accumulated streaming text is promoted to content so a
    /// truncated run still shows what it produced.
    fn close_open_assistant(&mut self) {
        if let Some(Message::Assistant(msg)) = self.messages.last_mut() {
            if msg.is_open() {
                if msg.content.is_empty() && !msg.streaming_content.is_empty() {
                    msg.content = std::mem::take(&mut msg.streaming_content);
                } else {
                    msg.streaming_content.clear();
                }
                msg.status_message = None;
                msg.status = MessageStatus::Complete;
            }
        }
    }
}

fn merge_tool_call_patch(call: &mut ToolCall, patch: ToolCallPatch) {
    let failed = patch.error.is_some();
    if let Some(duration) = patch.duration {
        call.duration = Some(duration);
    }
    if let Some(response) = patch.response {
        call.response = Some(response);
    }
    if let Some(error) = patch.error {
        call.error = Some(error);
    }
    if let Some(visualizations) = patch.visualizations {
        call.visualizations = Some(visualizations);
    }
    if let Some(sub_steps) = patch.sub_steps {
        call.sub_steps = Some(sub_steps);
    }
    if let Some(action) = patch.action {
        call.action = Some(action);
    }
    call.status = if failed {
        ToolCallStatus::Error
    } else {
        ToolCallStatus::Complete
    };
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use crate::conversation::message::RunMeta;

    use super::*;

    fn ts() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().unwrap()
    }

    fn add_user(id: &str, text: &str) -> ConversationAction {
        ConversationAction::AddUserMessage {
            id: id.to_string(),
            text: text.to_string(),
            timestamp: ts(),
        }
    }

    fn add_assistant(id: &str) -> ConversationAction {
        ConversationAction::AddAssistantMessage {
            id: id.to_string(),
            timestamp: ts(),
        }
    }

    fn tool_call(id: &str, step: u32) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            step,
            agent: "GraphExplorerAgent".to_string(),
            query: "blast radius".to_string(),
            reasoning: None,
            status: ToolCallStatus::Running,
            duration: None,
            response: None,
            error: None,
            visualizations: None,
            sub_steps: None,
            action: None,
        }
    }

    fn start_tool(message_id: &str, call: ToolCall) -> ConversationAction {
        ConversationAction::ToolCallStart {
            message_id: message_id.to_string(),
            tool_call: call,
        }
    }

    fn complete_tool(message_id: &str, call_id: &str, patch: ToolCallPatch) -> ConversationAction {
        ConversationAction::ToolCallComplete {
            message_id: message_id.to_string(),
            tool_call_id: call_id.to_string(),
            patch,
        }
    }

    fn assistant(state: &ConversationState, id: &str) -> AssistantMessage {
        state
            .messages
            .iter()
            .find_map(|m| m.as_assistant().filter(|a| a.id == id))
            .cloned()
            .expect("assistant message present")
    }

    fn seeded() -> ConversationState {
        let mut state = ConversationState::default();
        state.apply(add_user("msg_0", "fibre cut"));
        state.apply(add_assistant("msg_1"));
        state
    }

    // ------------------------------------------------------------------------
    // Appending turns
    // ------------------------------------------------------------------------

    #[test]
    fn user_then_assistant_appends_in_order() {
        let state = seeded();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].id(), "msg_0");
        assert_eq!(assistant(&state, "msg_1").status, MessageStatus::Pending);
    }

    #[test]
    fn new_user_message_force_closes_open_assistant() {
        let mut state = seeded();
        state.apply(ConversationAction::MessageDelta {
            message_id: "msg_1".to_string(),
            text: "partial diag".to_string(),
        });

        state.apply(add_user("msg_2", "any update?"));

        let closed = assistant(&state, "msg_1");
        assert_eq!(closed.status, MessageStatus::Complete);
        assert_eq!(closed.content, "partial diag");
        assert!(closed.streaming_content.is_empty());
    }

    #[test]
    fn new_assistant_message_force_closes_previous() {
        let mut state = seeded();
        state.apply(add_assistant("msg_2"));

        assert_eq!(assistant(&state, "msg_1").status, MessageStatus::Complete);
        assert_eq!(assistant(&state, "msg_2").status, MessageStatus::Pending);
    }

    // ------------------------------------------------------------------------
    // Tool calls
    // ------------------------------------------------------------------------

    #[test]
    fn tool_call_start_appends_and_starts_streaming() {
        let mut state = seeded();
        state.apply(start_tool("msg_1", tool_call("a1", 1)));

        let msg = assistant(&state, "msg_1");
        assert_eq!(msg.status, MessageStatus::Streaming);
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].status, ToolCallStatus::Running);
    }

    #[test]
    fn tool_call_start_preserves_input_order() {
        let mut state = seeded();
        state.apply(start_tool("msg_1", tool_call("a1", 1)));
        state.apply(start_tool("msg_1", tool_call("a2", 2)));
        state.apply(start_tool("msg_1", tool_call("a3", 3)));

        let ids: Vec<_> = assistant(&state, "msg_1")
            .tool_calls
            .iter()
            .map(|t| t.id.clone())
            .collect();
        assert_eq!(ids, ["a1", "a2", "a3"]);
    }

    #[test]
    fn tool_call_start_unknown_message_is_noop() {
        let mut state = seeded();
        let before = state.clone();

        state.apply(start_tool("msg_99", tool_call("a1", 1)));

        assert_eq!(state, before);
    }

    #[test]
    fn tool_call_start_on_terminal_message_is_noop() {
        let mut state = seeded();
        state.apply(ConversationAction::Error {
            message_id: "msg_1".to_string(),
            message: "down".to_string(),
        });
        let before = state.clone();

        state.apply(start_tool("msg_1", tool_call("late", 7)));

        assert_eq!(state, before);
    }

    #[test]
    fn tool_calls_complete_out_of_start_order() {
        let mut state = seeded();
        state.apply(start_tool("msg_1", tool_call("a1", 1)));
        state.apply(start_tool("msg_1", tool_call("a2", 2)));

        state.apply(complete_tool(
            "msg_1",
            "a2",
            ToolCallPatch {
                response: Some("LINK-1 degraded".to_string()),
                ..Default::default()
            },
        ));

        let msg = assistant(&state, "msg_1");
        assert_eq!(msg.tool_calls[0].status, ToolCallStatus::Running);
        assert_eq!(msg.tool_calls[1].status, ToolCallStatus::Complete);
        assert_eq!(msg.tool_calls[1].response.as_deref(), Some("LINK-1 degraded"));
    }

    #[test]
    fn tool_call_complete_unknown_id_is_noop() {
        let mut state = seeded();
        state.apply(start_tool("msg_1", tool_call("a1", 1)));
        let before = state.clone();

        state.apply(complete_tool(
            "msg_1",
            "a9",
            ToolCallPatch {
                response: Some("ghost".to_string()),
                ..Default::default()
            },
        ));

        assert_eq!(state, before);
    }

    #[test]
    fn tool_call_complete_with_error_marks_error() {
        let mut state = seeded();
        state.apply(start_tool("msg_1", tool_call("a1", 1)));
        state.apply(complete_tool(
            "msg_1",
            "a1",
            ToolCallPatch {
                error: Some("sub-agent timeout".to_string()),
                ..Default::default()
            },
        ));

        let call = assistant(&state, "msg_1").tool_calls[0].clone();
        assert_eq!(call.status, ToolCallStatus::Error);
        assert_eq!(call.error.as_deref(), Some("sub-agent timeout"));
    }

    #[test]
    fn completed_tool_call_is_not_remerged() {
        let mut state = seeded();
        state.apply(start_tool("msg_1", tool_call("a1", 1)));
        state.apply(complete_tool(
            "msg_1",
            "a1",
            ToolCallPatch {
                response: Some("first".to_string()),
                ..Default::default()
            },
        ));
        let before = state.clone();

        state.apply(complete_tool(
            "msg_1",
            "a1",
            ToolCallPatch {
                response: Some("second".to_string()),
                ..Default::default()
            },
        ));

        assert_eq!(state, before);
    }

    #[test]
    fn patch_merges_without_clobbering_absent_fields() {
        let mut state = seeded();
        let mut call = tool_call("a1", 1);
        call.reasoning = Some("suspect fibre path".to_string());
        state.apply(start_tool("msg_1", call));

        state.apply(complete_tool(
            "msg_1",
            "a1",
            ToolCallPatch {
                duration: Some("2.4s".to_string()),
                ..Default::default()
            },
        ));

        let call = assistant(&state, "msg_1").tool_calls[0].clone();
        assert_eq!(call.reasoning.as_deref(), Some("suspect fibre path"));
        assert_eq!(call.query, "blast radius");
        assert_eq!(call.duration.as_deref(), Some("2.4s"));
        assert!(call.response.is_none());
    }

    // ------------------------------------------------------------------------
    // Content streaming
    // ------------------------------------------------------------------------

    #[test]
    fn deltas_accumulate_monotonically() {
        let mut state = seeded();
        let parts = ["Root ", "cause: ", "LINK-1"];
        let mut expected = String::new();

        for part in parts {
            state.apply(ConversationAction::MessageDelta {
                message_id: "msg_1".to_string(),
                text: part.to_string(),
            });
            expected.push_str(part);
            let msg = assistant(&state, "msg_1");
            assert_eq!(msg.streaming_content, expected);
            assert_eq!(msg.status, MessageStatus::Streaming);
        }
    }

    #[test]
    fn message_complete_text_is_authoritative() {
        let mut state = seeded();
        state.apply(ConversationAction::MessageDelta {
            message_id: "msg_1".to_string(),
            text: "Root cause: LIN".to_string(),
        });

        state.apply(ConversationAction::MessageComplete {
            message_id: "msg_1".to_string(),
            text: "Root cause: LINK-1 (rerouted)".to_string(),
        });

        let msg = assistant(&state, "msg_1");
        assert_eq!(msg.content, "Root cause: LINK-1 (rerouted)");
        assert!(msg.streaming_content.is_empty());
        assert_eq!(msg.status, MessageStatus::Complete);
    }

    // ------------------------------------------------------------------------
    // Terminal transitions
    // ------------------------------------------------------------------------

    #[test]
    fn run_complete_attaches_meta_after_message_complete() {
        let mut state = seeded();
        state.apply(ConversationAction::MessageComplete {
            message_id: "msg_1".to_string(),
            text: "Root cause: LINK-1".to_string(),
        });

        state.apply(ConversationAction::RunComplete {
            message_id: "msg_1".to_string(),
            meta: RunMeta {
                steps: 1,
                time: "4.2s".to_string(),
            },
        });

        let msg = assistant(&state, "msg_1");
        assert_eq!(msg.status, MessageStatus::Complete);
        assert_eq!(msg.run_meta.as_ref().map(|m| m.steps), Some(1));
    }

    #[test]
    fn run_complete_is_idempotent() {
        let mut state = seeded();
        let meta = RunMeta {
            steps: 1,
            time: "4.2s".to_string(),
        };

        state.apply(ConversationAction::RunComplete {
            message_id: "msg_1".to_string(),
            meta: meta.clone(),
        });
        let once = state.clone();

        state.apply(ConversationAction::RunComplete {
            message_id: "msg_1".to_string(),
            meta: RunMeta {
                steps: 99,
                time: "later".to_string(),
            },
        });

        assert_eq!(state, once);
        assert_eq!(assistant(&state, "msg_1").run_meta, Some(meta));
    }

    #[test]
    fn error_is_idempotent() {
        let mut state = seeded();
        state.apply(ConversationAction::Error {
            message_id: "msg_1".to_string(),
            message: "agent pool exhausted".to_string(),
        });
        let once = state.clone();

        state.apply(ConversationAction::Error {
            message_id: "msg_1".to_string(),
            message: "different message".to_string(),
        });

        assert_eq!(state, once);
        assert_eq!(
            assistant(&state, "msg_1").error_message.as_deref(),
            Some("agent pool exhausted")
        );
    }

    #[test]
    fn error_after_complete_is_noop() {
        let mut state = seeded();
        state.apply(ConversationAction::MessageComplete {
            message_id: "msg_1".to_string(),
            text: "done".to_string(),
        });
        let before = state.clone();

        state.apply(ConversationAction::Error {
            message_id: "msg_1".to_string(),
            message: "late failure".to_string(),
        });

        assert_eq!(state, before);
    }

    #[test]
    fn run_complete_after_error_is_noop() {
        let mut state = seeded();
        state.apply(ConversationAction::Error {
            message_id: "msg_1".to_string(),
            message: "down".to_string(),
        });
        let before = state.clone();

        state.apply(ConversationAction::RunComplete {
            message_id: "msg_1".to_string(),
            meta: RunMeta {
                steps: 3,
                time: "9s".to_string(),
            },
        });

        assert_eq!(state, before);
    }

    #[test]
    fn cancelled_is_a_distinct_terminal_state() {
        let mut state = seeded();
        state.apply(ConversationAction::Cancelled {
            message_id: "msg_1".to_string(),
        });

        let msg = assistant(&state, "msg_1");
        assert_eq!(msg.status, MessageStatus::Cancelled);
        assert!(msg.error_message.is_none());

        // Terminal: no resurrection.
        let before = state.clone();
        state.apply(ConversationAction::MessageDelta {
            message_id: "msg_1".to_string(),
            text: "zombie".to_string(),
        });
        assert_eq!(state, before);
    }

    #[test]
    fn status_is_transient_and_cleared_on_terminal() {
        let mut state = seeded();
        state.apply(ConversationAction::Status {
            message_id: "msg_1".to_string(),
            message: "Dispatching GraphExplorerAgent".to_string(),
        });
        assert_eq!(
            assistant(&state, "msg_1").status_message.as_deref(),
            Some("Dispatching GraphExplorerAgent")
        );
        // A status line alone never advances the lifecycle.
        assert_eq!(assistant(&state, "msg_1").status, MessageStatus::Pending);

        state.apply(ConversationAction::MessageComplete {
            message_id: "msg_1".to_string(),
            text: "done".to_string(),
        });
        assert!(assistant(&state, "msg_1").status_message.is_none());
    }

    // ------------------------------------------------------------------------
    // Wholesale state operations
    // ------------------------------------------------------------------------

    #[test]
    fn set_messages_replaces_transcript() {
        let mut state = seeded();
        let replacement = vec![Message::User(UserMessage {
            id: "msg_7".to_string(),
            text: "replayed".to_string(),
            timestamp: ts(),
        })];

        state.apply(ConversationAction::SetMessages(replacement.clone()));

        assert_eq!(state.messages, replacement);
    }

    #[test]
    fn set_session_and_running_flags() {
        let mut state = ConversationState::default();
        state.apply(ConversationAction::SetSession(Some(
            "session_1".to_string(),
        )));
        state.apply(ConversationAction::SetRunning(true));
        assert_eq!(state.active_session_id.as_deref(), Some("session_1"));
        assert!(state.running);

        state.apply(ConversationAction::SetSession(None));
        assert!(state.active_session_id.is_none());
    }

    #[test]
    fn clear_drops_transcript_and_stops_running() {
        let mut state = seeded();
        state.apply(ConversationAction::SetRunning(true));
        state.apply(ConversationAction::Clear);

        assert!(state.messages.is_empty());
        assert!(!state.running);
    }

    // ------------------------------------------------------------------------
    // End-to-end fold
    // ------------------------------------------------------------------------

    #[test]
    fn fibre_cut_run_reaches_expected_final_state() {
        let mut state = ConversationState::default();
        state.apply(add_user("msg_0", "fibre cut"));
        state.apply(add_assistant("msg_1"));
        state.apply(start_tool("msg_1", tool_call("a1", 1)));
        state.apply(complete_tool(
            "msg_1",
            "a1",
            ToolCallPatch {
                response: Some("3 services".to_string()),
                ..Default::default()
            },
        ));
        state.apply(ConversationAction::MessageComplete {
            message_id: "msg_1".to_string(),
            text: "Root cause: LINK-1".to_string(),
        });
        state.apply(ConversationAction::RunComplete {
            message_id: "msg_1".to_string(),
            meta: RunMeta {
                steps: 1,
                time: "4.2s".to_string(),
            },
        });

        assert_eq!(state.messages.len(), 2);
        let msg = assistant(&state, "msg_1");
        assert_eq!(msg.status, MessageStatus::Complete);
        assert_eq!(msg.content, "Root cause: LINK-1");
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].status, ToolCallStatus::Complete);
        assert_eq!(msg.tool_calls[0].response.as_deref(), Some("3 services"));
        assert_eq!(
            msg.run_meta,
            Some(RunMeta {
                steps: 1,
                time: "4.2s".to_string()
            })
        );
    }
}
