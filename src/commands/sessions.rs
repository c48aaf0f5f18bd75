//! Manage sessions stored on the backend.

use std::path::Path;

use anyhow::{Context, Result};

use warroom::client::BackendClient;
use warroom::config::Config;
use warroom::eventlog;
use warroom::session::SessionDirectory;

pub async fn list(config_path: &str, server: Option<&str>) -> Result<()> {
    let client = connect(config_path, server).await?;
    let mut directory = SessionDirectory::new(client);
    let sessions = directory
        .refresh()
        .await
        .context("Failed to list sessions")?;

    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!("{:<20} {:<10} {:<20} ALERT", "SESSION", "STATUS", "CREATED");
    for session in sessions {
        println!(
            "{:<20} {:<10} {:<20} {}",
            session.id,
            session.status.to_string(),
            session.created_at.format("%Y-%m-%d %H:%M:%S"),
            truncate(&session.alert_text, 48)
        );
    }
    Ok(())
}

pub async fn delete(config_path: &str, server: Option<&str>, session_id: &str) -> Result<()> {
    let client = connect(config_path, server).await?;
    let mut directory = SessionDirectory::new(client);
    directory
        .delete(session_id)
        .await
        .with_context(|| format!("Failed to delete session {session_id}"))?;
    println!("Deleted {session_id}");
    Ok(())
}

pub async fn export(
    config_path: &str,
    server: Option<&str>,
    session_id: &str,
    out: &Path,
) -> Result<()> {
    let client = connect(config_path, server).await?;
    let detail = client
        .get_session(session_id)
        .await
        .with_context(|| format!("Failed to fetch session {session_id}"))?;
    eventlog::export_session(&detail, out)
        .await
        .context("Failed to export the event log")?;
    println!(
        "Exported {} events to {}",
        detail.event_log.len(),
        out.display()
    );
    Ok(())
}

async fn connect(config_path: &str, server: Option<&str>) -> Result<BackendClient> {
    let config = Config::load(config_path)
        .await
        .context("Failed to load configuration")?;
    Ok(super::backend_client(&config, server))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
