//! File discovery with include/exclude globs relative to the scan root.
//!
//! `*` and `?` never cross a `/`; only `**` spans directories. A pattern
//! must match the whole relative path, so `*.md` selects top-level files only.

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::{io_err, Result, SyncError};

/// Compiled include/exclude patterns.
pub struct PatternSet {
    include: GlobSet,
    exclude: GlobSet,
}

impl PatternSet {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_matcher(include)?,
            exclude: build_matcher(exclude)?,
        })
    }

    /// `relative` must be relative to the scan root.
    pub fn selects(&self, relative: &Path) -> bool {
        let relative = slash_path(relative);
        self.include.is_match(&relative) && !self.exclude.is_match(&relative)
    }
}

fn build_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| SyncError::Config(format!("invalid glob pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| SyncError::Config(format!("invalid glob patterns: {e}")))
}

fn slash_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lists the files under `project_root/scan.root` selected by the scan patterns,
/// as absolute paths in file-name order.
pub fn scan(project_root: &Path, scan: &ScanConfig) -> Result<Vec<PathBuf>> {
    let root = if scan.root.as_os_str().is_empty() || scan.root == Path::new(".") {
        project_root.to_path_buf()
    } else {
        project_root.join(&scan.root)
    };
    let patterns = PatternSet::new(&scan.include, &scan.exclude)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&root).to_path_buf();
            io_err(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(&root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if patterns.selects(relative) {
            debug!(file = %relative.display(), "Matched file");
            files.push(entry.into_path());
        }
    }

    info!(root = %root.display(), files = files.len(), "Scan complete");
    Ok(files)
}
