//! Subcommand implementations.

pub mod checkpoint;
pub mod delete;
pub mod dump_wal;
pub mod get;
pub mod inspect;
pub mod query;
pub mod upsert;

use crate::error::{CliError, CliResult};

/// Output format for commands that print records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One human-readable line per record.
    Text,
    /// Pretty JSON.
    Json,
}

impl Format {
    pub fn parse(name: &str) -> CliResult<Self> {
        match name {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CliError::argument(format!("unknown format: {other}"))),
        }
    }
}
