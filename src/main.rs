mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use warroom::config::DEFAULT_CONFIG_PATH;

// ============================================================================
// CLI Types
// ============================================================================

/// Warroom - A terminal client for streaming multi-agent incident investigations
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an investigation run and stream it live
    Run {
        /// Alert text to investigate
        #[arg(value_name = "ALERT")]
        alert: String,

        /// Scenario to run against (overrides config file)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Write the run's event log to a JSONL file afterwards
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,

        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Backend URL (overrides config file)
        #[arg(long)]
        server: Option<String>,
    },

    /// Rebuild a stored session's transcript from its event log
    Replay {
        /// Session ID to fetch from the backend
        #[arg(
            value_name = "SESSION_ID",
            required_unless_present = "file",
            conflicts_with = "file"
        )]
        session_id: Option<String>,

        /// Replay a local JSONL export instead of fetching from the backend
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,

        /// Backend URL (overrides config file)
        #[arg(long)]
        server: Option<String>,
    },

    /// Manage sessions on the backend
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,

        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
        config: String,

        /// Backend URL (overrides config file)
        #[arg(long, global = true)]
        server: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SessionsAction {
    /// List sessions
    List,

    /// Delete a session
    Delete {
        #[arg(value_name = "SESSION_ID")]
        session_id: String,
    },

    /// Export a session's event log to a JSONL file
    Export {
        #[arg(value_name = "SESSION_ID")]
        session_id: String,

        /// Output path
        #[arg(short, long, value_name = "PATH")]
        out: PathBuf,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            alert,
            scenario,
            export,
            config,
            server,
        } => {
            commands::run::run(
                &config,
                server.as_deref(),
                &alert,
                scenario.as_deref(),
                export.as_deref(),
            )
            .await
        }
        Commands::Replay {
            session_id,
            file,
            config,
            server,
        } => {
            commands::replay::run(
                &config,
                server.as_deref(),
                session_id.as_deref(),
                file.as_deref(),
            )
            .await
        }
        Commands::Sessions {
            action,
            config,
            server,
        } => match action {
            SessionsAction::List => commands::sessions::list(&config, server.as_deref()).await,
            SessionsAction::Delete { session_id } => {
                commands::sessions::delete(&config, server.as_deref(), &session_id).await
            }
            SessionsAction::Export { session_id, out } => {
                commands::sessions::export(&config, server.as_deref(), &session_id, &out).await
            }
        },
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
