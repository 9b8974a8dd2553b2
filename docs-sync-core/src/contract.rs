//! # contract: seams between the pipeline and the outside world
//!
//! The pipeline talks to three external collaborators, each behind a narrow trait:
//!
//! - [`KnowledgeApi`]: the knowledge-base HTTP service (list, remove, upload,
//!   processing status, register). Implemented for real by
//!   [`crate::openwebui::OpenWebUiClient`].
//! - [`CommandRunner`]: the git client subprocess. Implemented for real by
//!   [`crate::mirror::SystemGit`].
//! - [`Clock`]: time reading and waiting for the processing-status poll.
//!   Implemented for real by [`TokioClock`].
//!
//! ## Mocking & Testing
//! - `KnowledgeApi` and `CommandRunner` are annotated for `mockall`; the mocks are
//!   exported behind the `test-export-mocks` feature so integration tests can use them.
//! - [`ManualClock`] advances its own time on `sleep`, so polling can be tested
//!   without waiting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::SyncError;

/// One entry of a remote knowledge collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeFile {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub hash: Option<String>,
}

/// Response of a file upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
    #[serde(default)]
    pub id: String,
}

/// Server-side processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Completed | ProcessState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessStatus {
    pub status: ProcessState,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProcessStatus {
    pub fn new(status: ProcessState) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ProcessState::Failed,
            error: Some(message.into()),
        }
    }
}

/// Knowledge-base service: collections of ingested files plus the asynchronous
/// processing job behind every upload.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait KnowledgeApi: Send + Sync {
    /// List the current entries of a collection.
    async fn list_files(&self, knowledge_id: &str) -> Result<Vec<KnowledgeFile>, SyncError>;

    /// Remove one entry from a collection.
    async fn remove_file(&self, knowledge_id: &str, file_id: &str) -> Result<(), SyncError>;

    /// Upload raw file bytes; returns the server-assigned file identifier.
    async fn upload_file(&self, filename: &str, content: Vec<u8>)
        -> Result<UploadedFile, SyncError>;

    /// Fetch the processing status of an uploaded file.
    async fn process_status(&self, file_id: &str) -> Result<ProcessStatus, SyncError>;

    /// Register an uploaded (and processed) file in a collection.
    async fn add_file(&self, knowledge_id: &str, file_id: &str) -> Result<(), SyncError>;
}

/// Exit status and combined stdout/stderr of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub output: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Runs the version-control client with a working directory and argument list.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CommandRunner: Send + Sync {
    fn run(&self, dir: &Path, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// Time source for polling loops.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock whose time only moves when something sleeps on it.
#[cfg(any(test, feature = "test-export-mocks"))]
#[derive(Debug)]
pub struct ManualClock {
    state: std::sync::Mutex<(Instant, u32)>,
}

#[cfg(any(test, feature = "test-export-mocks"))]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: std::sync::Mutex::new((Instant::now(), 0)),
        }
    }

    /// Number of `sleep` calls so far.
    pub fn sleeps(&self) -> u32 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).1
    }

    /// Total simulated time slept so far.
    pub fn slept(&self, start: Instant) -> Duration {
        self.now().duration_since(start)
    }
}

#[cfg(any(test, feature = "test-export-mocks"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-export-mocks"))]
#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.0 += duration;
        state.1 += 1;
    }
}
