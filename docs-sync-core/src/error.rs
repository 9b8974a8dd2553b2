//! Error type shared by every docs-sync pipeline stage.
//!
//! Each stage returns the first error it hits. Variants map one-to-one onto the
//! failure kinds a caller has to tell apart: bad configuration, a missing
//! snapshot, local I/O, git, the knowledge API, and the processing timeout.
//! [`SyncError::Release`] is kept separate because it is raised only after
//! every destination already succeeded.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid settings. Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The snapshot for a project key does not exist yet.
    #[error("snapshot not found ({}). Run `docs-sync precommit` first", .path.display())]
    NotFound { path: PathBuf },

    /// Local filesystem failure, annotated with the path involved.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A git invocation exited non-zero (or could not be spawned).
    #[error("git {command} failed: {output}")]
    Vcs { command: String, output: String },

    /// Non-2xx response, transport failure or unreadable body from the knowledge API.
    #[error("{}", remote_message(.status, .body))]
    Remote { status: Option<u16>, body: String },

    /// The processing status of an uploaded file never became terminal.
    #[error("timed out after {}s waiting for file {file_id} to be processed", .waited.as_secs())]
    Timeout { file_id: String, waited: Duration },

    /// Every destination succeeded but the snapshot could not be removed.
    #[error("sync completed, but failed to remove snapshot {}: {source}", .path.display())]
    Release {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn remote_message(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("knowledge API error ({code}): {body}"),
        None => format!("knowledge API error: {body}"),
    }
}

impl SyncError {
    /// Remote error carrying an HTTP status.
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        SyncError::Remote {
            status: Some(status),
            body: body.into(),
        }
    }

    /// Remote error with no HTTP status (transport failure, malformed body, failed job).
    pub fn remote_detail(body: impl Into<String>) -> Self {
        SyncError::Remote {
            status: None,
            body: body.into(),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Remote {
            status: e.status().map(|s| s.as_u16()),
            body: e.to_string(),
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
