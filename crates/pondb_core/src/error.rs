//! Error types for pondb core.

use crate::record::PrimaryKey;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in pondb core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] pondb_storage::StorageError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] pondb_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record with the key exists and the update policy forbids
    /// overwriting it.
    #[error("conflict: record {key} already exists in {collection}")]
    Conflict {
        /// Collection written to.
        collection: String,
        /// The conflicting key.
        key: PrimaryKey,
    },

    /// An insert-only write hit an existing key.
    #[error("duplicate key {key} in {collection}")]
    DuplicateKey {
        /// Collection written to.
        collection: String,
        /// The duplicated key.
        key: PrimaryKey,
    },

    /// The operation needs an existing record and none was found.
    #[error("record {key} not found in {collection}")]
    NotFound {
        /// Collection searched.
        collection: String,
        /// The missing key.
        key: PrimaryKey,
    },

    /// A field is missing or holds a value of the wrong kind.
    #[error("field {field}: expected {expected}, found {found}")]
    FieldType {
        /// Field name.
        field: String,
        /// Expected value kind.
        expected: &'static str,
        /// Kind actually present (`"missing"` when absent).
        found: &'static str,
    },

    /// WAL is corrupted or invalid.
    #[error("WAL corruption: {message}")]
    WalCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// Transaction was aborted.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for abort.
        reason: String,
    },

    /// Invalid database layout or options.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// Another process holds the database lock.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,

    /// Database is closed.
    #[error("database is closed")]
    DatabaseClosed,
}

impl CoreError {
    /// Creates a conflict error.
    pub fn conflict(collection: impl Into<String>, key: PrimaryKey) -> Self {
        Self::Conflict {
            collection: collection.into(),
            key,
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(collection: impl Into<String>, key: PrimaryKey) -> Self {
        Self::DuplicateKey {
            collection: collection.into(),
            key,
        }
    }

    /// Creates a not found error.
    pub fn not_found(collection: impl Into<String>, key: PrimaryKey) -> Self {
        Self::NotFound {
            collection: collection.into(),
            key,
        }
    }

    /// Creates a WAL corruption error.
    pub fn wal_corruption(message: impl Into<String>) -> Self {
        Self::WalCorruption {
            message: message.into(),
        }
    }

    /// Creates a transaction aborted error.
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// True for the three key-policy violations raised by upsert.
    #[must_use]
    pub fn is_key_violation(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::DuplicateKey { .. } | Self::NotFound { .. }
        )
    }
}
