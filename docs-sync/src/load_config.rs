/// `load_config` module: reads `docssync.yaml` from the project root and injects
/// secrets from the environment.
///
/// # Responsibilities
/// - Locate and parse the YAML file into [`DocsSyncConfig`]
/// - Let `DOCSSYNC_REPO_TOKEN` and `DOCSSYNC_OPENWEBUI_API_KEY` override the
///   tokens in the file, so they can stay out of version control
/// - Produce clear errors naming the file when it is missing or malformed
///
/// Validation of the loaded values happens in the core pipeline, per command.
use anyhow::{anyhow, Result};
use docs_sync_core::config::DocsSyncConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const CONFIG_FILE_NAME: &str = "docssync.yaml";
pub const REPO_TOKEN_ENV: &str = "DOCSSYNC_REPO_TOKEN";
pub const API_KEY_ENV: &str = "DOCSSYNC_OPENWEBUI_API_KEY";

pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE_NAME)
}

/// Loads `<project_root>/docssync.yaml` and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(project_root: P) -> Result<DocsSyncConfig> {
    let path = config_path(project_root.as_ref());
    info!(config_path = ?path, "Loading configuration from file");

    if !path.is_file() {
        error!(config_path = ?path, "Config file not found");
        return Err(anyhow!(
            "{CONFIG_FILE_NAME} not found in {}. Create a {CONFIG_FILE_NAME} file at the project root",
            project_root.as_ref().display()
        ));
    }

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path, e));
        }
    };

    let mut config: DocsSyncConfig = match serde_yaml::from_str(&content) {
        Ok(conf) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML {:?}: {e}", path));
        }
    };

    if let Some(token) = env_secret(REPO_TOKEN_ENV) {
        info!(var = REPO_TOKEN_ENV, "Repository token taken from environment");
        config.sync.docusaurus.repo_token = token;
    }
    if let Some(key) = env_secret(API_KEY_ENV) {
        info!(var = API_KEY_ENV, "Open WebUI API key taken from environment");
        config.sync.openwebui.api_key = key;
    }

    config.trace_loaded();
    Ok(config)
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
