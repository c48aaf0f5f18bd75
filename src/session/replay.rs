//! Reconstruction of a transcript from a persisted event log.
//!
//! Replay walks the stored records through the same projection and
//! reducer the live controller uses, so a finished session renders
//! exactly as it did while it streamed. Records that fail to decode are
//! skipped with a warning; one corrupt record must not discard the rest
//! of an investigation.

use tracing::{debug, warn};

use crate::api::{RunEvent, SessionDetail, sse};
use crate::conversation::{ConversationState, EventProjection, Message};

/// Rebuild the transcript of a stored session.
///
/// The first user turn is synthesized from the session's `alert_text` and
/// `created_at` when the log does not begin with a `user_message` record
/// (older backends only started logging at `run.start`).
#[must_use]
pub fn replay_session(detail: &SessionDetail) -> Vec<Message> {
    let mut projection = EventProjection::new();
    let mut state = ConversationState::default();

    let has_user_head = detail
        .event_log
        .first()
        .is_some_and(|record| record.event_type == sse::USER_MESSAGE);
    if !has_user_head {
        let synthesized = RunEvent::parse(
            sse::USER_MESSAGE,
            &serde_json::json!({ "text": detail.alert_text }).to_string(),
        );
        if let Ok(Some(event)) = synthesized {
            for action in projection.project(event, detail.created_at) {
                state.apply(action);
            }
        }
    }

    for record in &detail.event_log {
        match RunEvent::parse(&record.event_type, &record.payload) {
            Ok(Some(event)) => {
                for action in projection.project(event, record.timestamp) {
                    state.apply(action);
                }
            }
            Ok(None) => {
                debug!(
                    session_id = %detail.id,
                    event_type = %record.event_type,
                    "skipping unknown event type in stored log"
                );
            }
            Err(e) => {
                warn!(
                    session_id = %detail.id,
                    event_type = %record.event_type,
                    error = %e,
                    "skipping corrupt record in stored log"
                );
            }
        }
    }

    state.messages
}
