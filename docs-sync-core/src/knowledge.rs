//! Knowledge sync: makes a remote knowledge collection hold exactly the
//! snapshot's markdown files.
//!
//! Per run the collection is first emptied, then every markdown file goes
//! through upload → poll until processed → register, one file at a time. The
//! processing endpoint is tracked per file id, so files are never uploaded
//! concurrently. The first failure ends the run; files registered before it
//! stay registered.
//!
//! # Navigation
//! - Main entrypoint: [`sync_knowledge`]
//! - Polling policy: [`PollPolicy`]
//! - Output: [`KnowledgeReport`]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::contract::{Clock, KnowledgeApi, ProcessState};
use crate::error::{io_err, Result, SyncError};

/// Fixed-interval polling bounds for the processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeReport {
    /// Ids of the entries removed by the clear step.
    pub removed: Vec<String>,
    pub registered: Vec<RegisteredFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredFile {
    pub file_id: String,
    pub filename: String,
}

/// Markdown files under `snapshot`, in file-name order.
pub fn markdown_files(snapshot: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(snapshot).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(snapshot).to_path_buf();
            io_err(path, e.into())
        })?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "md")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Replaces the contents of collection `knowledge_id` with the markdown files in `snapshot`.
pub async fn sync_knowledge<K, C>(
    api: &K,
    clock: &C,
    policy: PollPolicy,
    snapshot: &Path,
    knowledge_id: &str,
) -> Result<KnowledgeReport>
where
    K: KnowledgeApi + ?Sized,
    C: Clock + ?Sized,
{
    let files = markdown_files(snapshot)?;
    if files.is_empty() {
        warn!(snapshot = %snapshot.display(), "No markdown files to send to the knowledge base");
        return Ok(KnowledgeReport::default());
    }
    info!(knowledge_id, files = files.len(), "Starting knowledge sync");

    let mut report = KnowledgeReport {
        removed: clear_collection(api, knowledge_id).await?,
        registered: Vec::with_capacity(files.len()),
    };

    for path in &files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = fs::read(path).map_err(|e| io_err(path, e))?;

        info!(file = %filename, "Uploading file");
        let uploaded = api.upload_file(&filename, content).await.map_err(|e| {
            error!(file = %filename, error = %e, "Upload failed");
            e
        })?;
        if uploaded.id.trim().is_empty() {
            error!(file = %filename, "Upload returned an empty file id");
            return Err(SyncError::remote_detail(format!(
                "upload of {filename} returned an empty file id"
            )));
        }

        wait_for_processing(api, clock, policy, &uploaded.id).await?;

        api.add_file(knowledge_id, &uploaded.id).await.map_err(|e| {
            error!(file = %filename, file_id = %uploaded.id, error = %e, "Registering file failed");
            e
        })?;
        info!(file = %filename, file_id = %uploaded.id, "Added to knowledge collection");

        report.registered.push(RegisteredFile {
            file_id: uploaded.id,
            filename,
        });
    }

    info!(
        knowledge_id,
        removed = report.removed.len(),
        registered = report.registered.len(),
        "Knowledge sync finished"
    );
    Ok(report)
}

/// Removes every entry of the collection; returns the removed ids.
pub async fn clear_collection<K>(api: &K, knowledge_id: &str) -> Result<Vec<String>>
where
    K: KnowledgeApi + ?Sized,
{
    info!(knowledge_id, "Clearing knowledge collection");
    let entries = api.list_files(knowledge_id).await?;
    if entries.is_empty() {
        info!(knowledge_id, "Knowledge collection already empty");
        return Ok(Vec::new());
    }

    let mut removed = Vec::with_capacity(entries.len());
    for entry in entries {
        api.remove_file(knowledge_id, &entry.id).await?;
        info!(file_id = %entry.id, filename = %entry.filename, "Removed from knowledge collection");
        removed.push(entry.id);
    }
    Ok(removed)
}

/// Polls the processing status of `file_id` until it completes, fails, or
/// `policy.timeout` elapses.
pub async fn wait_for_processing<K, C>(
    api: &K,
    clock: &C,
    policy: PollPolicy,
    file_id: &str,
) -> Result<()>
where
    K: KnowledgeApi + ?Sized,
    C: Clock + ?Sized,
{
    info!(file_id, "Waiting for processing");
    let start = clock.now();

    while clock.now().duration_since(start) < policy.timeout {
        let status = api.process_status(file_id).await?;
        match status.status {
            ProcessState::Completed => {
                info!(file_id, "Processing completed");
                return Ok(());
            }
            ProcessState::Failed => {
                let message = status.error.unwrap_or_else(|| "no error message".into());
                error!(file_id, error = %message, "Processing failed");
                return Err(SyncError::remote_detail(format!(
                    "processing of file {file_id} failed: {message}"
                )));
            }
            state => {
                tracing::debug!(file_id, ?state, "Still processing");
                clock.sleep(policy.interval).await;
            }
        }
    }

    let waited = clock.now().duration_since(start);
    error!(file_id, waited_secs = waited.as_secs(), "Timed out waiting for processing");
    Err(SyncError::Timeout {
        file_id: file_id.to_string(),
        waited,
    })
}
