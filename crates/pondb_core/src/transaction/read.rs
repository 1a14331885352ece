//! Snapshot reads.

use super::TransactionManager;
use crate::error::CoreResult;
use crate::query::Query;
use crate::record::{Object, PrimaryKey, Record};
use crate::types::{SequenceNumber, TransactionId};
use std::sync::Arc;

/// A read-only view pinned to the commit sequence current at begin.
///
/// Later commits are invisible to it; start a new read transaction to see
/// them. Readers never block the writer.
pub struct ReadTransaction {
    id: TransactionId,
    snapshot: SequenceNumber,
    manager: Arc<TransactionManager>,
}

impl ReadTransaction {
    pub(crate) fn new(
        id: TransactionId,
        snapshot: SequenceNumber,
        manager: Arc<TransactionManager>,
    ) -> Self {
        Self {
            id,
            snapshot,
            manager,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the snapshot sequence number.
    #[must_use]
    pub fn snapshot(&self) -> SequenceNumber {
        self.snapshot
    }

    /// Looks up a record by key.
    #[must_use]
    pub fn get(&self, collection: &str, key: &PrimaryKey) -> Option<Record> {
        self.manager.table().get_at(collection, key, self.snapshot)
    }

    /// Returns true if a record with `key` exists.
    #[must_use]
    pub fn contains(&self, collection: &str, key: &PrimaryKey) -> bool {
        self.get(collection, key).is_some()
    }

    /// Every record of a collection, ordered by key.
    #[must_use]
    pub fn scan(&self, collection: &str) -> Vec<Record> {
        self.manager.table().scan_at(collection, self.snapshot)
    }

    /// Records matching `query`, ordered by key.
    #[must_use]
    pub fn query(&self, query: &Query) -> Vec<Record> {
        query.select(self.scan(query.collection()))
    }

    /// Number of records matching `query`.
    #[must_use]
    pub fn count(&self, query: &Query) -> usize {
        self.query(query).len()
    }

    /// First record matching `query`.
    #[must_use]
    pub fn first(&self, query: &Query) -> Option<Record> {
        self.query(&query.clone().limit(1)).into_iter().next()
    }

    /// Looks up a typed object.
    pub fn get_object<T: Object>(&self, key: &PrimaryKey) -> CoreResult<Option<T>> {
        self.get(T::COLLECTION, key)
            .map(|record| T::from_record(&record))
            .transpose()
    }

    /// Names of non-empty collections.
    #[must_use]
    pub fn collections(&self) -> Vec<String> {
        self.manager.table().collection_names(self.snapshot)
    }
}

impl Drop for ReadTransaction {
    fn drop(&mut self) {
        self.manager.release_reader(self.id);
    }
}

impl std::fmt::Debug for ReadTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadTransaction")
            .field("id", &self.id)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}
