//! Command-line interface for docs-sync.
//!
//! Two subcommands share the `--path` option (project root, default `.`):
//!
//! - `precommit`: discover documentation files and stage them into
//!   `<cwd>/<baseDir>/<projectKey>`.
//! - `commit`: publish the staged snapshot to the enabled destinations and
//!   remove it once all of them succeeded.
//!
//! All pipeline logic lives in `docs-sync-core`; this module only loads
//! configuration, wires the real git/HTTP/clock implementations and reports
//! the outcome.
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docs_sync_core::contract::TokioClock;
use docs_sync_core::knowledge::PollPolicy;
use docs_sync_core::mirror::{MirrorOutcome, SystemGit};
use docs_sync_core::openwebui::OpenWebUiClient;
use docs_sync_core::pipeline::{self, Destinations};
use std::path::PathBuf;

/// CLI for docs-sync: stage and publish project documentation.
#[derive(Parser)]
#[clap(
    name = "docs-sync",
    version,
    about = "Stage project documentation and publish it to a git docs mirror and an Open WebUI knowledge base"
)]
pub struct Cli {
    /// Project root containing docssync.yaml
    #[clap(short, long, global = true, default_value = ".")]
    pub path: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect documentation files into the staging directory
    Precommit,
    /// Publish the staged documentation to every enabled destination
    Commit,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!(path = %cli.path.display(), "docs-sync invoked");

    let project_root = cli
        .path
        .canonicalize()
        .with_context(|| format!("project path {} does not exist", cli.path.display()))?;
    let work_dir = std::env::current_dir().context("cannot determine working directory")?;
    let config = load_config(&project_root)?;

    match cli.command {
        Commands::Precommit => {
            tracing::info!(command = "precommit", "Starting precommit");
            let report = pipeline::precommit(&config, &project_root, &work_dir)?;
            match report.snapshot {
                Some(snapshot) => {
                    println!(
                        "Precommit generated at {} ({} files)",
                        snapshot.display(),
                        report.files
                    );
                }
                None => println!("No documentation files found, nothing staged"),
            }
            Ok(())
        }
        Commands::Commit => {
            tracing::info!(command = "commit", "Starting commit");
            let git = SystemGit::new();
            let knowledge = OpenWebUiClient::from_config(&config.sync.openwebui);
            let clock = TokioClock;
            let destinations = Destinations {
                git: &git,
                knowledge: &knowledge,
                clock: &clock,
                poll: PollPolicy::default(),
            };

            match pipeline::commit(&config, &work_dir, &destinations).await {
                Ok(report) => {
                    if let Some(outcome) = report.mirror {
                        match outcome {
                            MirrorOutcome::Committed => println!("Docusaurus mirror updated"),
                            MirrorOutcome::Unchanged => {
                                println!("Docusaurus mirror already up to date")
                            }
                        }
                    }
                    if let Some(knowledge) = &report.knowledge {
                        println!(
                            "Open WebUI knowledge base: {} removed, {} added",
                            knowledge.removed.len(),
                            knowledge.registered.len()
                        );
                    }
                    println!("Commit finished and precommit removed");
                    tracing::info!(command = "commit", ?report, "Commit complete");
                    Ok(())
                }
                Err(e) if pipeline::is_release_failure(&e) => {
                    tracing::warn!(command = "commit", error = %e, "Published, but cleanup failed");
                    Err(anyhow::Error::new(e))
                }
                Err(e) => {
                    tracing::error!(command = "commit", error = %e, "Commit failed, precommit kept for retry");
                    Err(anyhow::Error::new(e).context("commit failed; precommit kept for retry"))
                }
            }
        }
    }
}
