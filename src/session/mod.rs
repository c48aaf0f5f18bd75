//! Session orchestration.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────┐  create/select/delete  ┌───────────────┐
//!  │ SessionDirectory │───────────────────────▶│ BackendClient │
//!  │ (list + active)  │                        └───────┬───────┘
//!  └──────────────────┘                                │ SSE records
//!                                                      ▼
//!  ┌───────────────────┐   actions    ┌───────────────────────────┐
//!  │ SessionController │─────────────▶│ ConversationState         │
//!  │ (live run loop)   │              │ (watch-published snapshots)│
//!  └───────────────────┘              └───────────────────────────┘
//!
//!  replay_session: stored event log ──▶ same projection + reducer
//! ```
//!
//! - **SessionController**: owns the state of a live run; maps stream
//!   records to actions and publishes a snapshot after each one.
//! - **SessionDirectory**: the session list and the active selection.
//! - **replay_session**: rebuilds a finished session's transcript from
//!   its persisted event log.

mod controller;
mod directory;
mod replay;

pub use controller::{RunOutcome, SessionController};
pub use directory::SessionDirectory;
pub use replay::replay_session;
