//! Mirror sync: publishes a snapshot into the docs subtree of a git repository.
//!
//! The repository is cloned once into a fixed local directory and refreshed
//! (fetch, checkout, pull) on every later run. The project's subtree
//! `<docs_path>/<project_key>` is replaced wholesale by the snapshot, committed
//! only when `git status --porcelain` reports changes, and pushed.
//!
//! Push always runs, including after a no-op commit, so a commit stranded by an
//! earlier failed push goes out on the next run. Nothing is rolled back on
//! failure.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use reqwest::Url;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::config::MirrorConfig;
use crate::contract::{CommandOutput, CommandRunner};
use crate::error::{io_err, Result, SyncError};

/// Runs the `git` binary found on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: PathBuf,
}

impl SystemGit {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemGit {
    fn run(&self, dir: &Path, args: &[String]) -> io::Result<CommandOutput> {
        let out = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .output()?;

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(CommandOutput {
            success: out.status.success(),
            output,
        })
    }
}

/// Everything Mirror Sync needs to know about the destination repository.
#[derive(Debug, Clone)]
pub struct MirrorTarget {
    pub remote_url: String,
    pub branch: String,
    pub token: String,
    /// Docs root inside the repository, e.g. `docs`.
    pub docs_path: String,
    /// Local clone, reused across runs.
    pub clone_dir: PathBuf,
}

impl MirrorTarget {
    /// Resolves the clone directory against `work_dir`.
    pub fn from_config(config: &MirrorConfig, work_dir: &Path) -> Self {
        Self {
            remote_url: config.repo_url.clone(),
            branch: config.repo_branch.clone(),
            token: config.repo_token.clone(),
            docs_path: config.docs_path().to_string(),
            clone_dir: work_dir.join(config.clone_dir()),
        }
    }
}

/// Result of a successful mirror sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// A new commit was created and pushed.
    Committed,
    /// The subtree already matched the snapshot; no commit was made.
    Unchanged,
}

/// Inserts `token` into an HTTP(S) repository URL.
///
/// GitHub hosts take the token as the user name; other hosts take
/// `oauth2:<token>`. URLs that are not HTTP(S) (e.g. SSH) are returned unchanged.
pub fn inject_token(repo_url: &str, token: &str) -> String {
    if token.is_empty() {
        return repo_url.to_string();
    }
    let mut url = match Url::parse(repo_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => return repo_url.to_string(),
    };

    let is_github = url
        .host_str()
        .map(|host| host == "github.com" || host.ends_with(".github.com"))
        .unwrap_or(false);

    let applied = if is_github {
        url.set_username(token)
    } else {
        url.set_username("oauth2")
            .and_then(|_| url.set_password(Some(token)))
    };
    match applied {
        Ok(()) => url.to_string(),
        Err(()) => repo_url.to_string(),
    }
}

/// The forms a token can take in git output: raw and as written into a URL.
fn token_forms(token: &str) -> Vec<String> {
    if token.is_empty() {
        return Vec::new();
    }
    let mut forms = vec![token.to_string()];
    if let Ok(mut url) = Url::parse("https://host.invalid") {
        if url.set_username(token).is_ok() && url.username() != token {
            forms.push(url.username().to_string());
        }
    }
    forms
}

struct Git<'a, R: ?Sized> {
    runner: &'a R,
    secrets: Vec<String>,
}

impl<'a, R: CommandRunner + ?Sized> Git<'a, R> {
    fn new(runner: &'a R, token: &str) -> Self {
        Self {
            runner,
            secrets: token_forms(token),
        }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let command = self.redact(&args[0]);
        debug!(dir = %dir.display(), command = %command, "Running git");

        let out = self.runner.run(dir, &args).map_err(|e| SyncError::Vcs {
            command: command.clone(),
            output: e.to_string(),
        })?;
        if !out.success {
            let output = self.redact(out.output.trim());
            error!(dir = %dir.display(), command = %command, output = %output, "git command failed");
            return Err(SyncError::Vcs { command, output });
        }
        Ok(out.output)
    }

    fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), "***"))
    }
}

/// Replaces `<docs_path>/<project_key>` in the mirror with `snapshot`, commits if
/// anything changed and pushes `target.branch`.
pub fn sync_mirror<R>(
    runner: &R,
    target: &MirrorTarget,
    snapshot: &Path,
    project_key: &str,
) -> Result<MirrorOutcome>
where
    R: CommandRunner + ?Sized,
{
    let git = Git::new(runner, &target.token);
    let repo = target.clone_dir.as_path();
    info!(repo = %repo.display(), branch = %target.branch, "Syncing docs mirror");

    ensure_clone(&git, target)?;

    let subtree = format!("{}/{}", target.docs_path, project_key);
    let subtree_path = repo.join(&target.docs_path).join(project_key);
    match fs::remove_dir_all(&subtree_path) {
        Ok(()) => debug!(path = %subtree_path.display(), "Cleared mirror subtree"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(&subtree_path, e)),
    }
    copy_dir(snapshot, &subtree_path)?;
    info!(from = %snapshot.display(), to = %subtree_path.display(), "Copied snapshot into mirror");

    git.run(repo, &["add", &subtree])?;

    let status = git.run(repo, &["status", "--porcelain"])?;
    let outcome = if status.trim().is_empty() {
        info!(project_key, "No changes detected, skipping commit");
        MirrorOutcome::Unchanged
    } else {
        let message = commit_message(project_key);
        git.run(repo, &["commit", "-m", &message])?;
        info!(project_key, message = %message, "Committed mirror changes");
        MirrorOutcome::Committed
    };

    git.run(repo, &["push", "origin", &target.branch])?;
    info!(branch = %target.branch, ?outcome, "Docs mirror synchronised");
    Ok(outcome)
}

fn ensure_clone<R: CommandRunner + ?Sized>(git: &Git<'_, R>, target: &MirrorTarget) -> Result<()> {
    let repo = target.clone_dir.as_path();
    if repo.exists() {
        info!(repo = %repo.display(), "Updating existing mirror clone");
        git.run(repo, &["fetch"])?;
        git.run(repo, &["checkout", &target.branch])?;
        git.run(repo, &["pull"])?;
        return Ok(());
    }

    let parent = match repo.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = repo
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| SyncError::Config(format!("invalid clone directory {}", repo.display())))?;
    fs::create_dir_all(&parent).map_err(|e| io_err(&parent, e))?;

    info!(remote = %target.remote_url, repo = %repo.display(), "Cloning docs mirror");
    let auth_url = inject_token(&target.remote_url, &target.token);
    git.run(&parent, &["clone", "-b", &target.branch, &auth_url, &name])?;
    Ok(())
}

fn commit_message(project_key: &str) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M");
    format!("docs-sync: {stamp} {project_key}")
}

/// Recursively copies `from` into `to`, keeping directory layout and permissions.
pub fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            io_err(path, e.into())
        })?;
        let relative = match entry.path().strip_prefix(from) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let dest = to.join(relative);
        let metadata = entry.metadata().map_err(|e| io_err(entry.path(), e.into()))?;

        if metadata.is_dir() {
            fs::create_dir_all(&dest).map_err(|e| io_err(&dest, e))?;
            fs::set_permissions(&dest, metadata.permissions()).map_err(|e| io_err(&dest, e))?;
        } else if metadata.is_file() {
            // fs::copy carries the permission bits over.
            fs::copy(entry.path(), &dest).map_err(|e| io_err(&dest, e))?;
        }
    }
    Ok(())
}
