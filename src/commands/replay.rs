//! Rebuild a stored session's transcript from its event log.

use std::path::Path;

use anyhow::{Context, Result};

use warroom::api::SessionDetail;
use warroom::config::Config;
use warroom::conversation::{ConversationAction, ConversationState};
use warroom::session::replay_session;

use super::render;

pub async fn run(
    config_path: &str,
    server: Option<&str>,
    session_id: Option<&str>,
    file: Option<&Path>,
) -> Result<()> {
    let detail = load_detail(config_path, server, session_id, file).await?;

    // Replayed transcripts are loaded wholesale, never re-streamed.
    let mut state = ConversationState::default();
    state.apply(ConversationAction::SetSession(Some(detail.id.clone())));
    state.apply(ConversationAction::SetMessages(replay_session(&detail)));

    println!(
        "Session {} ({}) - {}, started {}",
        detail.id,
        detail.scenario,
        detail.status,
        detail.created_at.to_rfc3339()
    );
    println!();
    render::print_transcript(&state.messages);
    Ok(())
}

async fn load_detail(
    config_path: &str,
    server: Option<&str>,
    session_id: Option<&str>,
    file: Option<&Path>,
) -> Result<SessionDetail> {
    if let Some(path) = file {
        return warroom::eventlog::import_session(path)
            .await
            .with_context(|| format!("Failed to import event log from {}", path.display()));
    }

    // clap guarantees a session id when no file is given.
    let session_id = session_id.context("No session id or file provided")?;
    let config = Config::load(config_path)
        .await
        .context("Failed to load configuration")?;
    let client = super::backend_client(&config, server);
    client
        .get_session(session_id)
        .await
        .with_context(|| format!("Failed to fetch session {session_id}"))
}
