//! Error types for sync open.

use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while opening a synced database.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The download did not finish in time.
    #[error("download timed out after {after:?}")]
    Timeout {
        /// The configured timeout.
        after: Duration,
    },

    /// The remote source failed.
    #[error("remote source error: {message}")]
    Source {
        /// Error message.
        message: String,
        /// Whether the fetch can be retried.
        retryable: bool,
    },

    /// Database error while opening or applying changes.
    #[error("database error: {0}")]
    Database(#[from] pondb_core::CoreError),

    /// The open configuration is unusable.
    #[error("invalid sync configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Creates a retryable source error.
    pub fn source_retryable(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable source error.
    pub fn source_fatal(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried. Retrying is up to the
    /// caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Source { retryable, .. } => *retryable,
            SyncError::Timeout { .. } => true,
            SyncError::Database(_) | SyncError::InvalidConfig(_) => false,
        }
    }
}
