use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::tempdir;

use docs_sync_core::contract::{CommandOutput, MockCommandRunner};
use docs_sync_core::mirror::{sync_mirror, MirrorOutcome, MirrorTarget};
use docs_sync_core::SyncError;

type CallLog = Arc<Mutex<Vec<Vec<String>>>>;

fn target(work: &Path) -> MirrorTarget {
    MirrorTarget {
        remote_url: "https://github.com/acme/docs-portal.git".into(),
        branch: "main".into(),
        token: "ghp_secret".into(),
        docs_path: "docs".into(),
        clone_dir: work.join(".docssync"),
    }
}

fn snapshot_with(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    let snapshot = root.join("snapshot");
    fs::create_dir_all(&snapshot).unwrap();
    for (rel, content) in files {
        let path = snapshot.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    snapshot
}

/// Fake git: records every call, "clones" by creating the directory and
/// answers `status --porcelain` with `status_output`.
fn fake_git(log: CallLog, status_output: &'static str) -> MockCommandRunner {
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(move |dir, args| {
        log.lock().unwrap().push(args.to_vec());
        match args[0].as_str() {
            "clone" => {
                let name = args.last().unwrap();
                fs::create_dir_all(dir.join(name)).unwrap();
                Ok(CommandOutput::ok("Cloning into '.docssync'...\n"))
            }
            "status" => Ok(CommandOutput::ok(status_output)),
            _ => Ok(CommandOutput::ok("")),
        }
    });
    runner
}

fn subcommands(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|args| args[0].clone()).collect()
}

#[test]
fn first_sync_commits_and_repeat_sync_is_a_noop() {
    let work = tempdir().unwrap();
    let snapshot = snapshot_with(work.path(), &[("guide.md", "# Guide"), ("api/ref.md", "# Ref")]);
    let target = target(work.path());

    let first: CallLog = Arc::default();
    let runner = fake_git(first.clone(), " M docs/svc/guide.md\n");
    let outcome = sync_mirror(&runner, &target, &snapshot, "svc").unwrap();

    assert_eq!(outcome, MirrorOutcome::Committed);
    assert_eq!(
        subcommands(&first),
        vec!["clone", "add", "status", "commit", "push"]
    );
    let calls = first.lock().unwrap().clone();
    assert_eq!(
        calls[0],
        vec![
            "clone",
            "-b",
            "main",
            "https://ghp_secret@github.com/acme/docs-portal.git",
            ".docssync"
        ]
    );
    assert_eq!(calls[1], vec!["add", "docs/svc"]);
    assert!(calls[3][2].ends_with(" svc"), "commit message names the project");
    assert_eq!(calls[4], vec!["push", "origin", "main"]);
    assert_eq!(
        fs::read_to_string(target.clone_dir.join("docs/svc/api/ref.md")).unwrap(),
        "# Ref"
    );

    let second: CallLog = Arc::default();
    let runner = fake_git(second.clone(), "");
    let outcome = sync_mirror(&runner, &target, &snapshot, "svc").unwrap();

    assert_eq!(outcome, MirrorOutcome::Unchanged);
    assert_eq!(
        subcommands(&second),
        vec!["fetch", "checkout", "pull", "add", "status", "push"]
    );
    assert!(!subcommands(&second).contains(&"commit".to_string()));
}

#[test]
fn subtree_is_replaced_and_sibling_projects_untouched() {
    let work = tempdir().unwrap();
    let target = target(work.path());
    let docs = target.clone_dir.join("docs");
    fs::create_dir_all(docs.join("svc")).unwrap();
    fs::create_dir_all(docs.join("billing")).unwrap();
    fs::write(docs.join("svc/removed.md"), "stale").unwrap();
    fs::write(docs.join("billing/keep.md"), "other project").unwrap();

    let snapshot = snapshot_with(work.path(), &[("guide.md", "# Guide")]);
    let log: CallLog = Arc::default();
    let runner = fake_git(log.clone(), "D docs/svc/removed.md\n");

    sync_mirror(&runner, &target, &snapshot, "svc").unwrap();

    assert!(!docs.join("svc/removed.md").exists());
    assert!(docs.join("svc/guide.md").exists());
    assert_eq!(
        fs::read_to_string(docs.join("billing/keep.md")).unwrap(),
        "other project"
    );
    assert_eq!(subcommands(&log)[..3], ["fetch", "checkout", "pull"]);
}

#[test]
fn empty_snapshot_yields_empty_subtree() {
    let work = tempdir().unwrap();
    let target = target(work.path());
    fs::create_dir_all(target.clone_dir.join("docs/svc")).unwrap();
    fs::write(target.clone_dir.join("docs/svc/old.md"), "old").unwrap();
    let snapshot = snapshot_with(work.path(), &[]);

    let log: CallLog = Arc::default();
    let runner = fake_git(log.clone(), "");
    let outcome = sync_mirror(&runner, &target, &snapshot, "svc").unwrap();

    assert_eq!(outcome, MirrorOutcome::Unchanged);
    let subtree = target.clone_dir.join("docs/svc");
    assert!(subtree.is_dir());
    assert_eq!(fs::read_dir(subtree).unwrap().count(), 0);
}

#[test]
fn clone_failure_is_vcs_error_without_token() {
    let work = tempdir().unwrap();
    let target = target(work.path());
    let snapshot = snapshot_with(work.path(), &[("guide.md", "# Guide")]);

    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(|_, args: &[String]| args[0] == "clone")
        .times(1)
        .returning(|_, _| {
            Ok(CommandOutput::failed(
                "fatal: unable to access 'https://ghp_secret@github.com/acme/docs-portal.git/': Could not resolve host",
            ))
        });

    let err = sync_mirror(&runner, &target, &snapshot, "svc").unwrap_err();
    match err {
        SyncError::Vcs { command, output } => {
            assert_eq!(command, "clone");
            assert!(output.contains("Could not resolve host"));
            assert!(!output.contains("ghp_secret"), "token must be redacted");
        }
        other => panic!("expected VCS error, got {other:?}"),
    }
}

#[test]
fn clone_failure_redacts_url_encoded_token() {
    let work = tempdir().unwrap();
    let mut target = target(work.path());
    target.remote_url = "https://gitlab.example.com/team/portal.git".into();
    target.token = "p@ss:w/rd".into();
    let snapshot = snapshot_with(work.path(), &[("guide.md", "# Guide")]);

    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(|_, args: &[String]| args[0] == "clone")
        .times(1)
        .returning(|_, args| {
            // git echoes the remote URL exactly as it was passed on the command line.
            Ok(CommandOutput::failed(format!(
                "fatal: unable to access '{}': The requested URL returned error: 403",
                args[3]
            )))
        });

    let err = sync_mirror(&runner, &target, &snapshot, "svc").unwrap_err();
    match err {
        SyncError::Vcs { output, .. } => {
            assert!(output.contains("returned error: 403"));
            assert!(output.contains("oauth2:***@gitlab.example.com"));
            assert!(!output.contains("p%40ss"), "encoded token must be redacted");
            assert!(!output.contains("p@ss"));
        }
        other => panic!("expected VCS error, got {other:?}"),
    }
}

#[test]
fn push_failure_leaves_local_commit() {
    let work = tempdir().unwrap();
    let target = target(work.path());
    fs::create_dir_all(&target.clone_dir).unwrap();
    let snapshot = snapshot_with(work.path(), &[("guide.md", "# Guide")]);

    let log: CallLog = Arc::default();
    let l = log.clone();
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(move |_, args| {
        l.lock().unwrap().push(args.to_vec());
        match args[0].as_str() {
            "status" => Ok(CommandOutput::ok("A  docs/svc/guide.md\n")),
            "push" => Ok(CommandOutput::failed("! [rejected] main -> main (fetch first)")),
            _ => Ok(CommandOutput::ok("")),
        }
    });

    let err = sync_mirror(&runner, &target, &snapshot, "svc").unwrap_err();
    assert!(matches!(err, SyncError::Vcs { ref command, .. } if command == "push"));
    assert!(subcommands(&log).contains(&"commit".to_string()));
}

#[test]
fn spawn_failure_is_vcs_error() {
    let work = tempdir().unwrap();
    let target = target(work.path());
    fs::create_dir_all(&target.clone_dir).unwrap();
    let snapshot = snapshot_with(work.path(), &[]);

    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(|_, _| {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "git: command not found",
        ))
    });

    let err = sync_mirror(&runner, &target, &snapshot, "svc").unwrap_err();
    assert!(matches!(err, SyncError::Vcs { ref command, .. } if command == "fetch"));
}
