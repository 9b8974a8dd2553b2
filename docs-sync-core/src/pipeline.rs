//! High-level pipeline: `precommit` stages a snapshot, `commit` publishes it.
//!
//! `commit` runs the enabled destinations in a fixed order (mirror, then
//! knowledge) against one snapshot and returns on the first failure with the
//! snapshot left in place, so the same snapshot can be retried by re-running
//! `commit`. Only when every enabled destination succeeds is the snapshot
//! released.
//!
//! # Error Handling
//! Every step returns immediately with a [`SyncError`]. A failed release after
//! successful destinations surfaces as [`SyncError::Release`].

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::DocsSyncConfig;
use crate::contract::{Clock, CommandRunner, KnowledgeApi};
use crate::error::{Result, SyncError};
use crate::knowledge::{sync_knowledge, KnowledgeReport, PollPolicy};
use crate::mirror::{sync_mirror, MirrorOutcome, MirrorTarget};
use crate::scan::scan;
use crate::snapshot::SnapshotStore;

#[derive(Debug)]
pub struct PrecommitReport {
    /// `None` when discovery found nothing and no snapshot was staged.
    pub snapshot: Option<PathBuf>,
    pub files: usize,
}

#[derive(Debug)]
pub struct CommitReport {
    pub snapshot: PathBuf,
    pub mirror: Option<MirrorOutcome>,
    pub knowledge: Option<KnowledgeReport>,
}

/// External collaborators used by `commit`.
pub struct Destinations<'a, R: ?Sized, K: ?Sized, C: ?Sized> {
    pub git: &'a R,
    pub knowledge: &'a K,
    pub clock: &'a C,
    pub poll: PollPolicy,
}

fn snapshot_store(config: &DocsSyncConfig, work_dir: &Path) -> SnapshotStore {
    SnapshotStore::new(work_dir.join(config.precommit.base_dir()))
}

/// Discovers the documentation files under `project_root` and stages them as
/// the snapshot for the configured project key.
pub fn precommit(
    config: &DocsSyncConfig,
    project_root: &Path,
    work_dir: &Path,
) -> Result<PrecommitReport> {
    config.validate_project()?;
    let key = config.project.key.as_str();

    let files = scan(project_root, &config.scan)?;
    if files.is_empty() {
        warn!(project_key = key, "No documentation files found, nothing staged");
        return Ok(PrecommitReport {
            snapshot: None,
            files: 0,
        });
    }

    let store = snapshot_store(config, work_dir);
    let snapshot = store.stage(key, project_root, &files, &config.precommit.strip_dirs)?;
    Ok(PrecommitReport {
        snapshot: Some(snapshot),
        files: files.len(),
    })
}

/// Publishes the staged snapshot to every enabled destination, then releases it.
pub async fn commit<R, K, C>(
    config: &DocsSyncConfig,
    work_dir: &Path,
    destinations: &Destinations<'_, R, K, C>,
) -> Result<CommitReport>
where
    R: CommandRunner + ?Sized,
    K: KnowledgeApi + ?Sized,
    C: Clock + ?Sized,
{
    config.validate_project()?;
    config.validate_destinations()?;
    let key = config.project.key.as_str();

    let store = snapshot_store(config, work_dir);
    let snapshot = store.locate(key)?;
    info!(project_key = key, snapshot = %snapshot.display(), "Snapshot found");

    let mut report = CommitReport {
        snapshot: snapshot.clone(),
        mirror: None,
        knowledge: None,
    };

    if config.sync.docusaurus.enabled {
        info!(project_key = key, "Syncing with Docusaurus mirror");
        let target = MirrorTarget::from_config(&config.sync.docusaurus, work_dir);
        let outcome = sync_mirror(destinations.git, &target, &snapshot, key).map_err(|e| {
            error!(project_key = key, error = %e, "Mirror sync failed, snapshot kept");
            e
        })?;
        report.mirror = Some(outcome);
    }

    if config.sync.openwebui.enabled {
        info!(project_key = key, "Syncing with Open WebUI knowledge base");
        let knowledge = sync_knowledge(
            destinations.knowledge,
            destinations.clock,
            destinations.poll,
            &snapshot,
            &config.sync.openwebui.knowledge_id,
        )
        .await
        .map_err(|e| {
            error!(project_key = key, error = %e, "Knowledge sync failed, snapshot kept");
            e
        })?;
        report.knowledge = Some(knowledge);
    }

    if let Err(e) = store.release(&snapshot) {
        error!(project_key = key, error = %e, "Destinations synced but snapshot removal failed");
        return Err(e);
    }
    info!(project_key = key, "Commit finished and snapshot released");
    Ok(report)
}

/// True when the error happened after every destination already succeeded.
pub fn is_release_failure(err: &SyncError) -> bool {
    matches!(err, SyncError::Release { .. })
}
