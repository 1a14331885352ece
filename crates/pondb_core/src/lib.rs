//! # pondb core
//!
//! An embedded object store built around one contract: **upsert by primary
//! key**. A candidate [`Record`] is inserted, or replaces the record that
//! already owns its key, inside a single write transaction, according to an
//! [`UpdatePolicy`].
//!
//! This crate provides:
//! - [`Record`] / [`PrimaryKey`] / [`ObjectId`] and the typed [`Object`] trait
//! - a write-ahead log for durability and crash recovery
//! - single-writer transactions with snapshot reads
//! - the upsert resolver ([`WriteTransaction::upsert`])
//! - typed [`Filter`] queries and delete-by-query
//!
//! ```rust
//! use pondb_core::{Database, Record, UpdatePolicy};
//!
//! let db = Database::open_in_memory().unwrap();
//! let frog = Record::new("X").with("age", 45).with("species", "Green");
//! db.upsert("Frog", frog, UpdatePolicy::ReplaceAll).unwrap();
//!
//! let found = db.find("Frog", &"X".into()).unwrap().unwrap();
//! assert_eq!(found.get("age").and_then(|v| v.as_integer()), Some(45));
//! ```
//!
//! Records are plain values. Reading one gives a snapshot; to observe later
//! commits, look it up again.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod database;
mod dir;
mod error;
mod query;
mod record;
mod table;
mod transaction;
mod types;
mod upsert;
mod wal;

pub use config::Config;
pub use database::Database;
pub use error::{CoreError, CoreResult};
pub use query::{Cmp, Filter, Query};
pub use record::{Object, ObjectId, PrimaryKey, Record};
pub use transaction::{ReadTransaction, TransactionManager, TransactionState, WriteTransaction};
pub use types::{SequenceNumber, TransactionId};
pub use upsert::UpdatePolicy;
pub use wal::{WalManager, WalRecord, WalRecordType, WalScan, WAL_MAGIC, WAL_VERSION};

pub use pondb_codec::Value;
