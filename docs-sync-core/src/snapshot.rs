//! Snapshot store: the staged, project-scoped copy of documentation files.
//!
//! A snapshot lives at `<base_dir>/<project_key>`. Staging always replaces the
//! previous snapshot for the same key. Staging is not atomic: when a copy fails
//! halfway, the files already written stay on disk until the next precommit.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{io_err, Result, SyncError};

/// Owns the staging root under which one snapshot per project key is kept.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    base_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Where the snapshot for `project_key` lives, whether or not it exists.
    pub fn path_for(&self, project_key: &str) -> PathBuf {
        self.base_dir.join(project_key)
    }

    /// Returns the existing snapshot for `project_key`.
    pub fn locate(&self, project_key: &str) -> Result<PathBuf> {
        let path = self.path_for(project_key);
        if path.is_dir() {
            Ok(path)
        } else {
            Err(SyncError::NotFound { path })
        }
    }

    /// Copies `files` (absolute paths under `project_root`) into a fresh snapshot.
    ///
    /// Each file keeps its path relative to `project_root`, minus every segment
    /// listed in `strip_segments`. Files outside `project_root` are skipped.
    pub fn stage(
        &self,
        project_key: &str,
        project_root: &Path,
        files: &[PathBuf],
        strip_segments: &[String],
    ) -> Result<PathBuf> {
        let snapshot = self.path_for(project_key);

        match fs::remove_dir_all(&snapshot) {
            Ok(()) => debug!(path = %snapshot.display(), "Removed previous snapshot"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&snapshot, e)),
        }
        fs::create_dir_all(&snapshot).map_err(|e| io_err(&snapshot, e))?;

        let mut staged = 0usize;
        for file in files {
            let relative = match file.strip_prefix(project_root) {
                Ok(rel) => rel,
                Err(_) => {
                    warn!(
                        file = %file.display(),
                        project_root = %project_root.display(),
                        "File is outside the project root, skipping"
                    );
                    continue;
                }
            };

            let relative = to_slash(relative);
            let target = snapshot.join(strip_segments_from(&relative, strip_segments));

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
            copy_durable(file, &target)?;
            debug!(from = %file.display(), to = %target.display(), "Staged file");
            staged += 1;
        }

        info!(
            project_key,
            path = %snapshot.display(),
            files = staged,
            "Snapshot staged"
        );
        Ok(snapshot)
    }

    /// Removes a snapshot directory and everything under it.
    pub fn release(&self, snapshot: &Path) -> Result<()> {
        fs::remove_dir_all(snapshot).map_err(|source| SyncError::Release {
            path: snapshot.to_path_buf(),
            source,
        })?;
        info!(path = %snapshot.display(), "Snapshot released");
        Ok(())
    }
}

/// Drops every `/`-separated segment that exactly equals one of `strip`.
pub fn strip_segments_from(relative: &str, strip: &[String]) -> String {
    relative
        .split('/')
        .filter(|segment| !strip.iter().any(|s| s == segment))
        .collect::<Vec<_>>()
        .join("/")
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn copy_durable(from: &Path, to: &Path) -> Result<()> {
    let mut input = File::open(from).map_err(|e| io_err(from, e))?;
    let mut output = File::create(to).map_err(|e| io_err(to, e))?;
    io::copy(&mut input, &mut output).map_err(|e| io_err(to, e))?;
    output.sync_all().map_err(|e| io_err(to, e))
}
