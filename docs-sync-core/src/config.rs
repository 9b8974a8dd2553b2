use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{Result, SyncError};

pub const DEFAULT_BASE_DIR: &str = ".precommit";
pub const DEFAULT_DOCS_PATH: &str = "docs";
pub const DEFAULT_CLONE_DIR: &str = ".docssync";

/// Full `docssync.yaml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsSyncConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub precommit: PrecommitConfig,
    #[serde(default)]
    pub sync: SyncTargets,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub key: String,
}

/// Where and what to discover. Patterns are globs relative to `root`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    #[serde(default)]
    pub root: PathBuf,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecommitConfig {
    /// Staging root, relative to the working directory. Defaults to `.precommit`.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Path segments dropped from every staged relative path.
    #[serde(default)]
    pub strip_dirs: Vec<String>,
}

impl PrecommitConfig {
    pub fn base_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => PathBuf::from(DEFAULT_BASE_DIR),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTargets {
    #[serde(default, alias = "docsaurus")]
    pub docusaurus: MirrorConfig,
    #[serde(default)]
    pub openwebui: KnowledgeConfig,
}

/// Git docs mirror destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub repo_token: String,
    #[serde(default)]
    pub repo_branch: String,
    #[serde(default)]
    pub docs_path: Option<String>,
    #[serde(default)]
    pub clone_dir: Option<PathBuf>,
}

impl MirrorConfig {
    pub fn docs_path(&self) -> &str {
        match self.docs_path.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => DEFAULT_DOCS_PATH,
        }
    }

    pub fn clone_dir(&self) -> PathBuf {
        match &self.clone_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => PathBuf::from(DEFAULT_CLONE_DIR),
        }
    }
}

/// Open WebUI knowledge destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub knowledge_id: String,
}

impl DocsSyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            project_key = %self.project.key,
            include = self.scan.include.len(),
            mirror_enabled = self.sync.docusaurus.enabled,
            knowledge_enabled = self.sync.openwebui.enabled,
            "Loaded docs-sync config"
        );
        debug!(
            scan_root = %self.scan.root.display(),
            base_dir = %self.precommit.base_dir().display(),
            strip_dirs = ?self.precommit.strip_dirs,
            "Config loaded (details)"
        );
    }

    /// Checks the settings every command needs.
    pub fn validate_project(&self) -> Result<()> {
        if self.project.key.trim().is_empty() {
            return Err(SyncError::Config(
                "project.key is not set in docssync.yaml".into(),
            ));
        }
        Ok(())
    }

    /// Checks the settings of every enabled destination.
    pub fn validate_destinations(&self) -> Result<()> {
        let mirror = &self.sync.docusaurus;
        if mirror.enabled
            && (mirror.repo_url.is_empty()
                || mirror.repo_token.is_empty()
                || mirror.repo_branch.is_empty())
        {
            return Err(SyncError::Config(
                "sync.docusaurus requires repoUrl, repoToken and repoBranch".into(),
            ));
        }

        let knowledge = &self.sync.openwebui;
        if knowledge.enabled
            && (knowledge.api_url.is_empty()
                || knowledge.api_key.is_empty()
                || knowledge.knowledge_id.is_empty())
        {
            return Err(SyncError::Config(
                "sync.openwebui requires apiUrl, apiKey and knowledgeId".into(),
            ));
        }
        Ok(())
    }
}
