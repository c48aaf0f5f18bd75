//! Start an investigation run and follow it live.

use std::io;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use warroom::config::Config;
use warroom::conversation::{ConversationState, Message};
use warroom::eventlog;
use warroom::session::{RunOutcome, SessionController, SessionDirectory};

use super::render::ProgressPrinter;

pub async fn run(
    config_path: &str,
    server: Option<&str>,
    alert: &str,
    scenario: Option<&str>,
    export: Option<&Path>,
) -> Result<()> {
    let config = Config::load(config_path)
        .await
        .context("Failed to load configuration")?;
    let client = super::backend_client(&config, server);
    let scenario = scenario.unwrap_or(&config.run.scenario);

    let mut directory = SessionDirectory::new(client.clone());
    let created = directory
        .create(scenario, alert)
        .await
        .context("Failed to create session")?;
    println!("Session {} ({})", created.session_id, scenario);
    println!("Press Ctrl+C to cancel the run.");
    println!();

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let mut controller = SessionController::new(client.clone());
    let render_task = tokio::spawn(follow_snapshots(controller.snapshots()));

    let outcome = controller
        .run(&created, alert, cancel)
        .await
        .context("Failed to open the run stream")?;
    let final_state = controller.state().clone();

    // Dropping the controller closes the snapshot channel, which lets the
    // render task print the last snapshot and exit.
    drop(controller);
    let _ = render_task.await;

    println!();
    match outcome {
        RunOutcome::Completed => println!("Run completed."),
        RunOutcome::Cancelled => println!("Run cancelled."),
        RunOutcome::Failed => println!("Run failed."),
    }

    // Export even after a failed or cancelled run; the partial log is
    // exactly what a post-mortem wants.
    if let Some(path) = export {
        let detail = client
            .get_session(&created.session_id)
            .await
            .context("Failed to fetch the session for export")?;
        eventlog::export_session(&detail, path)
            .await
            .context("Failed to export the event log")?;
        println!("Event log written to {}", path.display());
    }

    if outcome == RunOutcome::Failed {
        bail!("{}", failure_reason(&final_state));
    }
    Ok(())
}

async fn follow_snapshots(mut snapshots: watch::Receiver<ConversationState>) {
    let mut printer = ProgressPrinter::new(io::stdout());
    loop {
        {
            let state = snapshots.borrow_and_update();
            if let Err(e) = printer.observe(&state) {
                debug!(error = %e, "stopping progress rendering");
                return;
            }
        }
        if snapshots.changed().await.is_err() {
            return;
        }
    }
}

fn failure_reason(state: &ConversationState) -> String {
    state
        .messages
        .iter()
        .rev()
        .find_map(Message::as_assistant)
        .and_then(|message| message.error_message.clone())
        .unwrap_or_else(|| "run ended in error".to_string())
}
