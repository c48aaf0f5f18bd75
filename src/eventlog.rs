//! Local event-log export and import.
//!
//! A session export is a JSONL file: the first line is the session
//! summary, every following line is one stored event record. The format
//! is append-friendly and survives partial corruption, so a log captured
//! from a flaky backend can still be replayed offline.
//!
//! ```text
//! {"id":"session_1","scenario":"telco-noc","alert_text":"fibre cut",...}
//! {"event_type":"user_message","payload":"{\"text\":\"fibre cut\"}","timestamp":"..."}
//! {"event_type":"run.start","payload":"{}","timestamp":"..."}
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::warn;

use crate::api::{EventRecord, SessionDetail, SessionSummary};

/// Result type for event log file operations.
pub type Result<T> = std::result::Result<T, EventLogError>;

/// Errors from reading or writing event log exports.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// Filesystem operation failed.
    #[error("event log io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The first line is missing or is not a session summary.
    #[error("invalid event log header in {path}: {reason}")]
    InvalidHeader { path: PathBuf, reason: String },

    /// Serializing the export failed.
    #[error("failed to serialize event log: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventLogError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write a session and its event log to a JSONL export file.
///
/// The file is written to a temp sibling and renamed into place, so a
/// crash mid-export never leaves a half-written file at `path`.
pub async fn export_session(detail: &SessionDetail, path: &Path) -> Result<()> {
    let mut buffer = serde_json::to_string(&detail.summary())?;
    buffer.push('\n');
    for record in &detail.event_log {
        buffer.push_str(&serde_json::to_string(record)?);
        buffer.push('\n');
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| EventLogError::io(parent, e))?;
    }

    let Some(file_name) = path.file_name() else {
        return Err(EventLogError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        ));
    };
    let temp_path = path.with_file_name(format!("{}.tmp", file_name.to_string_lossy()));

    fs::write(&temp_path, buffer.as_bytes())
        .await
        .map_err(|e| EventLogError::io(&temp_path, e))?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|e| EventLogError::io(path, e))?;

    Ok(())
}

/// Read a JSONL export back into a session.
///
/// Malformed event lines are skipped with a warning; a missing file, an
/// empty file, or a corrupt header line is an error.
pub async fn import_session(path: &Path) -> Result<SessionDetail> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|e| EventLogError::io(path, e))?;

    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Err(EventLogError::InvalidHeader {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    };
    let summary: SessionSummary =
        serde_json::from_str(header_line).map_err(|e| EventLogError::InvalidHeader {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut event_log = Vec::new();
    for (index, line) in lines.enumerate() {
        match serde_json::from_str::<EventRecord>(line) {
            Ok(record) => event_log.push(record),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    line = index + 2,
                    error = %e,
                    "skipping malformed event line in export"
                );
            }
        }
    }

    Ok(SessionDetail {
        id: summary.id,
        scenario: summary.scenario,
        alert_text: summary.alert_text,
        status: summary.status,
        created_at: summary.created_at,
        event_log,
    })
}
