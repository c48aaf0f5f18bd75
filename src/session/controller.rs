//! Live run controller.
//!
//! Drives one investigation run end to end: seeds the user turn and the
//! assistant placeholder, opens the SSE stream, folds every record into
//! the conversation state, and publishes an immutable snapshot after each
//! reduction so a renderer can follow along on a `watch` channel.
//!
//! The stream has no framing for "the server died": a socket that closes
//! without a terminal event looks identical to a healthy pause. The
//! controller therefore tracks whether a terminal event arrived and
//! escalates a silent end of stream to an error on the open assistant
//! message, so the transcript never strands a message in `Streaming`.

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{CreateSessionResponse, RunEvent};
use crate::client::{BackendClient, Result};
use crate::conversation::{ConversationAction, ConversationState, EventProjection};
use crate::sse_parser::SseRecord;

/// Message attached to the assistant turn when the transport drops the
/// run on the floor.
const DISCONNECT_MESSAGE: &str =
    "Connection to the investigation stream was lost before the run finished.";

/// How a live run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The backend reported `run.complete`.
    Completed,
    /// The backend reported `error`, or the stream ended without a
    /// terminal event.
    Failed,
    /// The user cancelled the run locally.
    Cancelled,
}

/// Owns the conversation state for a live session and the run loop that
/// feeds it.
#[derive(Debug)]
pub struct SessionController {
    client: BackendClient,
    state: ConversationState,
    snapshot_tx: watch::Sender<ConversationState>,
}

impl SessionController {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        let (snapshot_tx, _) = watch::channel(ConversationState::default());
        Self {
            client,
            state: ConversationState::default(),
            snapshot_tx,
        }
    }

    /// Subscribe to state snapshots. A new snapshot is published after
    /// every applied action.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<ConversationState> {
        self.snapshot_tx.subscribe()
    }

    /// The state as of the last applied action.
    #[must_use]
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Drive a freshly created session's run to its end.
    ///
    /// The user turn and assistant placeholder appear in the state before
    /// the stream opens; the server's own `user_message` and `run.start`
    /// records for this turn are absorbed instead of duplicated. Cancel
    /// via `cancel` at any point to end the run with
    /// [`RunOutcome::Cancelled`].
    pub async fn run(
        &mut self,
        session: &CreateSessionResponse,
        alert_text: &str,
        cancel: CancellationToken,
    ) -> Result<RunOutcome> {
        let mut projection = EventProjection::new();

        self.dispatch(ConversationAction::SetSession(Some(
            session.session_id.clone(),
        )));
        self.dispatch(ConversationAction::SetRunning(true));
        for action in projection.seed_turn(alert_text, Utc::now()) {
            self.dispatch(action);
        }

        let mut records = match self.client.open_run_stream(&session.stream_url).await {
            Ok(records) => records,
            Err(e) => {
                warn!(session_id = %session.session_id, error = %e, "failed to open run stream");
                self.interrupt(&projection, DISCONNECT_MESSAGE);
                self.dispatch(ConversationAction::SetRunning(false));
                return Err(e);
            }
        };

        let outcome = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(session_id = %session.session_id, "run cancelled locally");
                    if let Some(id) = projection.open_assistant() {
                        let message_id = id.to_string();
                        self.dispatch(ConversationAction::Cancelled { message_id });
                    }
                    break RunOutcome::Cancelled;
                }
                record = records.next() => match record {
                    Some(Ok(record)) => {
                        if let Some(outcome) = self.apply_record(&mut projection, record) {
                            break outcome;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session.session_id, error = %e, "run stream transport error");
                        self.interrupt(&projection, DISCONNECT_MESSAGE);
                        break RunOutcome::Failed;
                    }
                    None => {
                        warn!(session_id = %session.session_id, "run stream ended without a terminal event");
                        self.interrupt(&projection, DISCONNECT_MESSAGE);
                        break RunOutcome::Failed;
                    }
                }
            }
        };

        self.dispatch(ConversationAction::SetRunning(false));
        Ok(outcome)
    }

    /// Fold one SSE record into the state. Returns the run outcome when
    /// the record carried a terminal event.
    fn apply_record(
        &mut self,
        projection: &mut EventProjection,
        record: SseRecord,
    ) -> Option<RunOutcome> {
        let event = decode_record(&record)?;
        let outcome = match &event {
            RunEvent::RunComplete(_) => Some(RunOutcome::Completed),
            RunEvent::Error(_) => Some(RunOutcome::Failed),
            _ => None,
        };
        for action in projection.project(event, Utc::now()) {
            self.dispatch(action);
        }
        outcome
    }

    /// Mark the open assistant message failed with a generic message.
    fn interrupt(&mut self, projection: &EventProjection, message: &str) {
        if let Some(id) = projection.open_assistant() {
            let message_id = id.to_string();
            self.dispatch(ConversationAction::Error {
                message_id,
                message: message.to_string(),
            });
        }
    }

    fn dispatch(&mut self, action: ConversationAction) {
        self.state.apply(action);
        self.snapshot_tx.send_replace(self.state.clone());
    }
}

/// Decode one SSE record into a run event.
///
/// Records without an event name, with an unknown event type, or with a
/// payload that does not parse are all skipped: a newer backend must be
/// able to add event types without breaking this client mid-run.
fn decode_record(record: &SseRecord) -> Option<RunEvent> {
    let Some(event_type) = record.event.as_deref() else {
        debug!("skipping sse record without an event name");
        return None;
    };
    match RunEvent::parse(event_type, &record.data) {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            debug!(event_type, "ignoring unknown event type");
            None
        }
        Err(e) => {
            warn!(event_type, error = %e, "skipping malformed event payload");
            None
        }
    }
}
