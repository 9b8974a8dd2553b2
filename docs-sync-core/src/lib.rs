#![doc = "docs-sync-core: core pipeline library for docs-sync."]

//! This crate holds the staging and publishing logic of docs-sync:
//! the snapshot store, file discovery, the git mirror sync, the knowledge-base
//! sync and the pipeline that sequences them.
//!
//! # Usage
//! The `docs-sync` binary loads configuration and wires the real
//! implementations ([`mirror::SystemGit`], [`openwebui::OpenWebUiClient`],
//! [`contract::TokioClock`]) into [`pipeline::commit`]. Tests substitute the
//! mocks from [`contract`].

pub mod config;
pub mod contract;
pub mod error;
pub mod knowledge;
pub mod mirror;
pub mod openwebui;
pub mod pipeline;
pub mod scan;
pub mod snapshot;

pub use error::{Result, SyncError};
