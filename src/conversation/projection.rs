//! Wire event to reducer action projection.
//!
//! The live session controller and the replay engine both drive the
//! reducer through this one projection, which is what makes a replayed
//! event log reconstruct the same transcript a live fold produced: the
//! wire carries no message ids, so ids are allocated here from a
//! deterministic counter, and both paths walk the events in the same
//! order.

use chrono::{DateTime, Utc};

use crate::api::{MESSAGE_ID_PREFIX, RunEvent};

use super::action::ConversationAction;
use super::message::{RunMeta, ToolCall, ToolCallStatus};

/// Stateful map from [`RunEvent`]s to [`ConversationAction`]s.
///
/// One projection per run stream or per replayed log. The projection only
/// allocates ids and routes events to the current assistant message; all
/// transition rules live in the reducer.
#[derive(Debug, Default)]
pub struct EventProjection {
    next_message: u32,
    open_assistant: Option<String>,
    suppress_user_echo: bool,
    suppress_run_start_echo: bool,
}

impl EventProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a live turn before the stream opens: the user message and the
    /// assistant placeholder appear immediately, and the `user_message` /
    /// `run.start` records the server emits for this same turn are
    /// suppressed (one of each) instead of duplicating them.
    pub fn seed_turn(
        &mut self,
        alert_text: &str,
        timestamp: DateTime<Utc>,
    ) -> Vec<ConversationAction> {
        let user_id = self.next_id();
        let assistant_id = self.next_id();
        self.open_assistant = Some(assistant_id.clone());
        self.suppress_user_echo = true;
        self.suppress_run_start_echo = true;
        vec![
            ConversationAction::AddUserMessage {
                id: user_id,
                text: alert_text.to_string(),
                timestamp,
            },
            ConversationAction::AddAssistantMessage {
                id: assistant_id,
                timestamp,
            },
        ]
    }

    /// Map one decoded event to the reducer actions it implies.
    ///
    /// Message-scoped events arriving before any assistant message exists
    /// (a log with a truncated head) first synthesize the assistant turn,
    /// so recorded content is never silently dropped.
    pub fn project(
        &mut self,
        event: RunEvent,
        timestamp: DateTime<Utc>,
    ) -> Vec<ConversationAction> {
        match event {
            RunEvent::UserMessage(payload) => {
                if self.suppress_user_echo {
                    self.suppress_user_echo = false;
                    return Vec::new();
                }
                vec![ConversationAction::AddUserMessage {
                    id: self.next_id(),
                    text: payload.text,
                    timestamp,
                }]
            }
            RunEvent::RunStart => {
                if self.suppress_run_start_echo {
                    self.suppress_run_start_echo = false;
                    return Vec::new();
                }
                let id = self.next_id();
                self.open_assistant = Some(id.clone());
                vec![ConversationAction::AddAssistantMessage { id, timestamp }]
            }
            RunEvent::ToolCallStart(payload) => {
                let mut actions = Vec::new();
                let message_id = self.target_assistant(timestamp, &mut actions);
                actions.push(ConversationAction::ToolCallStart {
                    message_id,
                    tool_call: ToolCall {
                        id: payload.id,
                        step: payload.step,
                        agent: payload.agent,
                        query: payload.query,
                        reasoning: payload.reasoning,
                        status: ToolCallStatus::Running,
                        duration: None,
                        response: None,
                        error: None,
                        visualizations: None,
                        sub_steps: None,
                        action: None,
                    },
                });
                actions
            }
            RunEvent::ToolCallComplete(payload) => {
                let mut actions = Vec::new();
                let message_id = self.target_assistant(timestamp, &mut actions);
                let tool_call_id = payload.id.clone();
                actions.push(ConversationAction::ToolCallComplete {
                    message_id,
                    tool_call_id,
                    patch: payload.into(),
                });
                actions
            }
            RunEvent::MessageDelta(payload) => {
                let mut actions = Vec::new();
                let message_id = self.target_assistant(timestamp, &mut actions);
                actions.push(ConversationAction::MessageDelta {
                    message_id,
                    text: payload.text,
                });
                actions
            }
            RunEvent::MessageComplete(payload) => {
                let mut actions = Vec::new();
                let message_id = self.target_assistant(timestamp, &mut actions);
                actions.push(ConversationAction::MessageComplete {
                    message_id,
                    text: payload.text,
                });
                actions
            }
            RunEvent::RunComplete(payload) => {
                let mut actions = Vec::new();
                let message_id = self.target_assistant(timestamp, &mut actions);
                actions.push(ConversationAction::RunComplete {
                    message_id,
                    meta: RunMeta {
                        steps: payload.steps,
                        time: payload.time,
                    },
                });
                actions
            }
            RunEvent::Error(payload) => {
                let mut actions = Vec::new();
                let message_id = self.target_assistant(timestamp, &mut actions);
                actions.push(ConversationAction::Error {
                    message_id,
                    message: payload.message,
                });
                actions
            }
            RunEvent::Status(payload) => {
                let mut actions = Vec::new();
                let message_id = self.target_assistant(timestamp, &mut actions);
                actions.push(ConversationAction::Status {
                    message_id,
                    message: payload.message,
                });
                actions
            }
        }
    }

    /// Id of the assistant message the current run writes into, if any.
    pub fn open_assistant(&self) -> Option<&str> {
        self.open_assistant.as_deref()
    }

    fn next_id(&mut self) -> String {
        let id = format!("{}{}", MESSAGE_ID_PREFIX, self.next_message);
        self.next_message += 1;
        id
    }

    /// The open assistant id, synthesizing a new assistant turn when no
    /// run has started yet.
    fn target_assistant(
        &mut self,
        timestamp: DateTime<Utc>,
        actions: &mut Vec<ConversationAction>,
    ) -> String {
        if let Some(id) = &self.open_assistant {
            return id.clone();
        }
        let id = self.next_id();
        self.open_assistant = Some(id.clone());
        actions.push(ConversationAction::AddAssistantMessage {
            id: id.clone(),
            timestamp,
        });
        id
    }
}
