#![allow(dead_code)]
//! In-process mock of the war-room backend.
//!
//! Serves the session CRUD endpoints and a scripted SSE run stream over a
//! real TCP port, so the client stack under test is exactly the production
//! one end to end.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use serde_json::json;
use tokio::net::TcpListener;

use warroom::api::{
    CreateSessionRequest, CreateSessionResponse, EventRecord, ListSessionsResponse, SessionDetail,
    SessionStatus, SessionSummary, sse,
};
use warroom::client::BackendClient;

// ============================================================================
// Fixtures
// ============================================================================

/// The canonical fibre-cut run: one graph exploration step, then a
/// streamed root-cause answer.
pub fn fibre_cut_script() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        ("user_message", json!({"text": "fibre cut"})),
        ("run.start", json!({})),
        ("status", json!({"message": "Dispatching GraphExplorerAgent"})),
        (
            "tool_call.start",
            json!({
                "id": "a1",
                "step": 1,
                "agent": "GraphExplorerAgent",
                "query": "blast radius of the fibre cut"
            }),
        ),
        (
            "tool_call.complete",
            json!({"id": "a1", "duration": "1.8s", "response": "3 services degraded"}),
        ),
        ("message.delta", json!({"text": "Root cause: "})),
        ("message.delta", json!({"text": "LINK-1"})),
        ("message.complete", json!({"text": "Root cause: LINK-1"})),
        ("run.complete", json!({"steps": 1, "time": "4.2s"})),
    ]
}

// ============================================================================
// Backend State
// ============================================================================

/// Scripted backend state, shared with the serving task.
#[derive(Clone, Default)]
pub struct BackendState {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, SessionDetail>,
    script: Vec<(String, String)>,
    hold_open: bool,
    fail_deletes: bool,
    next_id: u32,
}

impl BackendState {
    /// Script the SSE records served on the next run stream.
    pub fn set_script(&self, records: &[(&str, serde_json::Value)]) {
        let mut inner = self.inner.lock().unwrap();
        inner.script = records
            .iter()
            .map(|(event, data)| (event.to_string(), data.to_string()))
            .collect();
    }

    /// Keep the run stream open after the script instead of closing it.
    pub fn hold_stream_open(&self) {
        self.inner.lock().unwrap().hold_open = true;
    }

    /// Make DELETE requests fail with a 500.
    pub fn fail_deletes(&self) {
        self.inner.lock().unwrap().fail_deletes = true;
    }

    /// Stored detail for a session, if any.
    pub fn session(&self, session_id: &str) -> Option<SessionDetail> {
        self.inner.lock().unwrap().sessions.get(session_id).cloned()
    }
}

// ============================================================================
// Server
// ============================================================================

/// A mock backend bound to an ephemeral local port.
pub struct MockBackend {
    pub state: BackendState,
    addr: SocketAddr,
}

impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A client pointed at this backend.
    pub fn client(&self) -> BackendClient {
        BackendClient::new(&self.base_url(), Duration::from_secs(5))
    }
}

/// Spawn the mock backend on an ephemeral port.
pub async fn spawn_backend() -> MockBackend {
    let state = BackendState::default();
    let app = Router::new()
        .route("/api/v1/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/v1/sessions/{session_id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/v1/sessions/{session_id}/stream", get(stream_session))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { state, addr }
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_sessions(State(state): State<BackendState>) -> Json<ListSessionsResponse> {
    let inner = state.inner.lock().unwrap();
    let mut sessions: Vec<SessionSummary> =
        inner.sessions.values().map(SessionDetail::summary).collect();
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Json(ListSessionsResponse { sessions })
}

async fn create_session(
    State(state): State<BackendState>,
    Json(request): Json<CreateSessionRequest>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let mut inner = state.inner.lock().unwrap();
    inner.next_id += 1;
    let session_id = format!("session_{}", inner.next_id);
    inner.sessions.insert(
        session_id.clone(),
        SessionDetail {
            id: session_id.clone(),
            scenario: request.scenario,
            alert_text: request.alert_text,
            status: SessionStatus::Running,
            created_at: Utc::now(),
            event_log: Vec::new(),
        },
    );
    let response = CreateSessionResponse {
        stream_url: format!("/api/v1/sessions/{session_id}/stream"),
        session_id,
    };
    (StatusCode::CREATED, Json(response))
}

async fn get_session(
    State(state): State<BackendState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.session(&session_id) {
        Some(detail) => Json(detail).into_response(),
        None => problem(StatusCode::NOT_FOUND, "session not found"),
    }
}

async fn delete_session(
    State(state): State<BackendState>,
    Path(session_id): Path<String>,
) -> Response {
    let mut inner = state.inner.lock().unwrap();
    if inner.fail_deletes {
        return problem(StatusCode::INTERNAL_SERVER_ERROR, "delete failed");
    }
    match inner.sessions.remove(&session_id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => problem(StatusCode::NOT_FOUND, "session not found"),
    }
}

async fn stream_session(
    State(state): State<BackendState>,
    Path(session_id): Path<String>,
) -> Response {
    let mut inner = state.inner.lock().unwrap();
    if !inner.sessions.contains_key(&session_id) {
        return problem(StatusCode::NOT_FOUND, "session not found");
    }
    let script = inner.script.clone();
    let hold_open = inner.hold_open;

    // Persist the run the way the real backend does: every served record
    // lands in the session's event log before it goes over the wire.
    let final_status = script_status(&script);
    if let Some(detail) = inner.sessions.get_mut(&session_id) {
        for (event_type, payload) in &script {
            detail
                .event_log
                .push(EventRecord::new(event_type.clone(), payload.clone(), Utc::now()));
        }
        detail.status = final_status;
    }
    drop(inner);

    let records = stream::iter(script.into_iter().map(|(event_type, data)| {
        Ok::<_, Infallible>(Event::default().event(event_type).data(data))
    }));
    if hold_open {
        Sse::new(records.chain(stream::pending())).into_response()
    } else {
        Sse::new(records).into_response()
    }
}

fn script_status(script: &[(String, String)]) -> SessionStatus {
    if script.iter().any(|(event, _)| event == sse::RUN_COMPLETE) {
        SessionStatus::Completed
    } else if script.iter().any(|(event, _)| event == sse::ERROR) {
        SessionStatus::Failed
    } else {
        SessionStatus::Running
    }
}

fn problem(status: StatusCode, detail: &str) -> Response {
    let body = json!({
        "type": "about:blank",
        "title": status.canonical_reason().unwrap_or("error"),
        "status": status.as_u16(),
        "detail": detail,
    });
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/problem+json"),
    );
    response
}
