//! CLI errors.

use thiserror::Error;

/// Result type for commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors reported by the `pondb` binary.
#[derive(Error, Debug)]
pub enum CliError {
    /// Database error.
    #[error(transparent)]
    Core(#[from] pondb_core::CoreError),

    /// Malformed JSON input.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A command-line argument could not be used.
    #[error("{0}")]
    Argument(String),
}

impl CliError {
    pub(crate) fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }
}
