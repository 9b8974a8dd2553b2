use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::tempdir;

use docs_sync::load_config::{load_config, API_KEY_ENV, REPO_TOKEN_ENV};

fn clear_env() {
    env::remove_var(REPO_TOKEN_ENV);
    env::remove_var(API_KEY_ENV);
}

/// A complete camelCase config maps onto every section.
#[test]
#[serial]
fn test_load_config_full_document() {
    clear_env();
    let project = tempdir().unwrap();
    let config_yaml = r#"
project:
  key: payments
scan:
  root: services/payments
  include: ["**/*.md", "**/*.mdx"]
  exclude: ["node_modules/**"]
precommit:
  baseDir: .staging
  stripDirs: [docs, internal]
sync:
  docusaurus:
    enabled: true
    repoUrl: https://github.com/acme/portal.git
    repoToken: from-file
    repoBranch: main
    docsPath: content/docs
  openwebui:
    enabled: true
    apiUrl: http://openwebui.local
    apiKey: sk-file
    knowledgeId: kb-42
"#;
    write(project.path().join("docssync.yaml"), config_yaml).unwrap();

    let config = load_config(project.path()).expect("Config should load");

    assert_eq!(config.project.key, "payments");
    assert_eq!(config.scan.root, PathBuf::from("services/payments"));
    assert_eq!(config.scan.include.len(), 2);
    assert_eq!(config.precommit.base_dir(), PathBuf::from(".staging"));
    assert_eq!(config.precommit.strip_dirs, vec!["docs", "internal"]);
    assert!(config.sync.docusaurus.enabled);
    assert_eq!(config.sync.docusaurus.docs_path(), "content/docs");
    assert_eq!(config.sync.docusaurus.clone_dir(), PathBuf::from(".docssync"));
    assert_eq!(config.sync.docusaurus.repo_token, "from-file");
    assert_eq!(config.sync.openwebui.knowledge_id, "kb-42");
    assert!(config.validate_destinations().is_ok());
}

/// Files written with the `docsaurus` spelling still configure the mirror.
#[test]
#[serial]
fn test_load_config_accepts_docsaurus_section() {
    clear_env();
    let project = tempdir().unwrap();
    let config_yaml = r#"
project:
  key: svc
sync:
  docsaurus:
    enabled: true
    repoUrl: https://gitlab.example.com/team/portal.git
    repoToken: glpat-file
    repoBranch: main
"#;
    write(project.path().join("docssync.yaml"), config_yaml).unwrap();

    let config = load_config(project.path()).expect("Config should load");

    assert!(config.sync.docusaurus.enabled);
    assert_eq!(
        config.sync.docusaurus.repo_url,
        "https://gitlab.example.com/team/portal.git"
    );
    assert_eq!(config.sync.docusaurus.repo_branch, "main");
    assert!(config.validate_destinations().is_ok());
}

/// Secrets from the environment win over the file.
#[test]
#[serial]
fn test_load_config_env_overrides_secrets() {
    clear_env();
    let project = tempdir().unwrap();
    write(
        project.path().join("docssync.yaml"),
        "project:\n  key: svc\nsync:\n  docusaurus:\n    repoToken: from-file\n  openwebui:\n    apiKey: sk-file\n",
    )
    .unwrap();

    env::set_var(REPO_TOKEN_ENV, "from-env");
    env::set_var(API_KEY_ENV, "sk-env");
    let config = load_config(project.path()).expect("Config should load");
    clear_env();

    assert_eq!(config.sync.docusaurus.repo_token, "from-env");
    assert_eq!(config.sync.openwebui.api_key, "sk-env");
}

/// Sections may be omitted; defaults apply.
#[test]
#[serial]
fn test_load_config_minimal_document() {
    clear_env();
    let project = tempdir().unwrap();
    write(project.path().join("docssync.yaml"), "project:\n  key: svc\n").unwrap();

    let config = load_config(project.path()).expect("Loader should allow missing sections");
    assert!(config.scan.include.is_empty());
    assert!(!config.sync.docusaurus.enabled);
    assert!(!config.sync.openwebui.enabled);
    assert_eq!(config.precommit.base_dir(), PathBuf::from(".precommit"));
}

#[test]
#[serial]
fn test_load_config_missing_file_names_expected_file() {
    let project = tempdir().unwrap();
    let err = load_config(project.path()).unwrap_err();
    assert!(err.to_string().contains("docssync.yaml"), "got: {err}");
}

#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    let project = tempdir().unwrap();
    write(project.path().join("docssync.yaml"), b"not-yaml: [:::").unwrap();

    let err = load_config(project.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}
