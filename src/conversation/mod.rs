//! Conversation state for the war-room transcript.
//!
//! # Architecture
//!
//! ```text
//!  wire events            actions                  state
//!  ┌────────────┐      ┌────────────────────┐   ┌───────────────────┐
//!  │ RunEvent   │─────▶│ ConversationAction │──▶│ ConversationState │
//!  │ (live SSE  │      │  (pure data)       │   │  apply() fold     │
//!  │  or replay)│      └────────────────────┘   └───────────────────┘
//!  └────────────┘
//!        ▲
//!        │ EventProjection allocates message ids and routes events;
//!        │ the live controller and the replay engine share it, so a
//!        │ replayed log folds to the same transcript as the live run.
//! ```
//!
//! - **message**: the renderable transcript types (`Message`, `ToolCall`).
//! - **action**: the closed set of state transitions.
//! - **reducer**: the total fold; all transition rules live here.
//! - **projection**: wire event to action mapping shared by live and replay.

mod action;
mod message;
mod projection;
mod reducer;

// Transcript types
pub use message::{
    AssistantMessage, Message, MessageStatus, RunMeta, ToolCall, ToolCallStatus, UserMessage,
};

// Fold machinery
pub use action::{ConversationAction, ToolCallPatch};
pub use projection::EventProjection;
pub use reducer::ConversationState;
