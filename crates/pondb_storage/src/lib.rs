//! # pondb storage
//!
//! Byte-store backends for pondb.
//!
//! A backend knows nothing about records, transactions or the WAL format.
//! It stores an append-only run of bytes that the core crate interprets.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral databases and tests; clones share bytes
//! - [`FileBackend`] - a single file on disk
//!
//! ## Example
//!
//! ```rust
//! use pondb_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frog").unwrap();
//! assert_eq!(backend.read_at(offset, 4).unwrap(), b"frog");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
