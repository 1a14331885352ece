//! # pondb sync
//!
//! Decides what happens when a synced database is opened: open the local
//! file straight away, or first download the remote state, with a timeout
//! and a choice of falling back to the local copy or failing.
//!
//! This crate provides:
//! - [`SyncOpenConfig`] with separate behaviour for new and existing files
//! - the [`RemoteSource`] trait a transport implements
//! - [`apply_changes`], which lands a downloaded batch in one transaction
//! - [`open_synced`], the async entry point
//!
//! The server is authoritative: downloaded records replace local ones with
//! [`pondb_core::UpdatePolicy::ReplaceAll`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod applier;
mod config;
mod error;
mod open;
mod source;

pub use applier::{apply_changes, ApplyStats};
pub use config::{OpenBehavior, SyncOpenConfig, TimeoutBehavior};
pub use error::{SyncError, SyncResult};
pub use open::{download, open_synced, OpenOutcome, OpenTarget};
pub use source::{MockSource, RemoteChange, RemoteSource};
