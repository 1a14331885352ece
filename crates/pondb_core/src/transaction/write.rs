//! The single write transaction.

use super::state::{PendingWrite, Transaction, TransactionState};
use super::TransactionManager;
use crate::error::{CoreError, CoreResult};
use crate::query::Query;
use crate::record::{Object, PrimaryKey, Record};
use crate::types::{SequenceNumber, TransactionId};
use crate::upsert::{self, UpdatePolicy};
use parking_lot::MutexGuard;
use std::collections::BTreeMap;

/// The one active write transaction.
///
/// Holds the database write lock from [`TransactionManager::begin_write`]
/// until it is committed, aborted or dropped. Reads inside it see the
/// latest committed state plus its own pending writes. Dropping an active
/// write transaction aborts it.
pub struct WriteTransaction<'a> {
    txn: Transaction,
    manager: &'a TransactionManager,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn new(
        txn: Transaction,
        manager: &'a TransactionManager,
        guard: MutexGuard<'a, ()>,
    ) -> Self {
        Self {
            txn,
            manager,
            _guard: guard,
        }
    }

    pub(crate) fn inner(&self) -> &Transaction {
        &self.txn
    }

    pub(crate) fn inner_mut(&mut self) -> &mut Transaction {
        &mut self.txn
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.txn.id()
    }

    /// Returns the snapshot sequence number the transaction reads from.
    #[must_use]
    pub fn snapshot(&self) -> SequenceNumber {
        self.txn.snapshot()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.txn.state()
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.txn.is_active()
    }

    /// Number of staged writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.txn.write_count()
    }

    /// Looks up a record, seeing this transaction's own writes.
    pub fn get(&self, collection: &str, key: &PrimaryKey) -> CoreResult<Option<Record>> {
        self.txn.ensure_active()?;
        if let Some(write) = self.txn.pending(collection, key) {
            return Ok(match write {
                PendingWrite::Put(record) => Some(record.clone()),
                PendingWrite::Delete => None,
            });
        }
        Ok(self
            .manager
            .table()
            .get_at(collection, key, self.txn.snapshot()))
    }

    /// Returns true if a record with `key` exists.
    pub fn contains(&self, collection: &str, key: &PrimaryKey) -> CoreResult<bool> {
        Ok(self.get(collection, key)?.is_some())
    }

    /// Stages `record` unconditionally, replacing any record with its key.
    pub fn put(&mut self, collection: &str, record: Record) -> CoreResult<()> {
        self.txn.put(collection, record)
    }

    /// Inserts or replaces `candidate` according to `policy`.
    ///
    /// Returns the record as it will read after commit. On error nothing is
    /// staged and the transaction stays usable.
    pub fn upsert(
        &mut self,
        collection: &str,
        candidate: Record,
        policy: UpdatePolicy,
    ) -> CoreResult<Record> {
        upsert::resolve(self, collection, candidate, policy)
    }

    /// Inserts `record`, failing with [`CoreError::DuplicateKey`] if its key
    /// is taken.
    pub fn insert(&mut self, collection: &str, record: Record) -> CoreResult<Record> {
        self.upsert(collection, record, UpdatePolicy::InsertOnly)
    }

    /// Upserts a typed object.
    pub fn upsert_object<T: Object>(&mut self, object: &T, policy: UpdatePolicy) -> CoreResult<T> {
        let stored = self.upsert(T::COLLECTION, object.to_record(), policy)?;
        T::from_record(&stored)
    }

    /// Looks up a typed object.
    pub fn get_object<T: Object>(&self, key: &PrimaryKey) -> CoreResult<Option<T>> {
        self.get(T::COLLECTION, key)?
            .map(|record| T::from_record(&record))
            .transpose()
    }

    /// Mutates the record with `key` in place.
    ///
    /// The closure works on a copy; the change is staged only if it returns
    /// `Ok`. Fails with [`CoreError::NotFound`] if there is no such record
    /// and with [`CoreError::InvalidOperation`] if the closure changes the
    /// key.
    pub fn update<F>(&mut self, collection: &str, key: &PrimaryKey, f: F) -> CoreResult<Record>
    where
        F: FnOnce(&mut Record) -> CoreResult<()>,
    {
        let mut record = self
            .get(collection, key)?
            .ok_or_else(|| CoreError::not_found(collection, key.clone()))?;
        f(&mut record)?;
        ensure_same_key(key, record.key())?;
        self.txn.put(collection, record.clone())?;
        Ok(record)
    }

    /// Mutates a typed object in place.
    pub fn update_object<T, F>(&mut self, key: &PrimaryKey, f: F) -> CoreResult<T>
    where
        T: Object,
        F: FnOnce(&mut T),
    {
        let mut object = self
            .get_object::<T>(key)?
            .ok_or_else(|| CoreError::not_found(T::COLLECTION, key.clone()))?;
        f(&mut object);
        let record = object.to_record();
        ensure_same_key(key, record.key())?;
        self.txn.put(T::COLLECTION, record)?;
        Ok(object)
    }

    /// Deletes the record with `key`. Returns whether it existed.
    pub fn delete(&mut self, collection: &str, key: &PrimaryKey) -> CoreResult<bool> {
        let existed = self.contains(collection, key)?;
        if existed {
            self.txn.delete(collection, key.clone())?;
        }
        Ok(existed)
    }

    /// Every record of a collection as this transaction sees it, ordered by
    /// key.
    pub fn scan(&self, collection: &str) -> CoreResult<Vec<Record>> {
        self.txn.ensure_active()?;
        let mut merged: BTreeMap<PrimaryKey, Record> = self
            .manager
            .table()
            .scan_at(collection, self.txn.snapshot())
            .into_iter()
            .map(|r| (r.key().clone(), r))
            .collect();
        for (key, write) in self.txn.pending_in(collection) {
            match write {
                PendingWrite::Put(record) => {
                    merged.insert(key.clone(), record.clone());
                }
                PendingWrite::Delete => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_values().collect())
    }

    /// Records matching `query`, including this transaction's writes.
    pub fn query(&self, query: &Query) -> CoreResult<Vec<Record>> {
        Ok(query.select(self.scan(query.collection())?))
    }

    /// Deletes every record matching `query`. Returns how many were deleted.
    pub fn delete_where(&mut self, query: &Query) -> CoreResult<usize> {
        let doomed = self.query(query)?;
        for record in &doomed {
            self.txn.delete(query.collection(), record.key().clone())?;
        }
        tracing::debug!(
            collection = query.collection(),
            deleted = doomed.len(),
            "delete by query staged"
        );
        Ok(doomed.len())
    }

    /// Commits, making every staged write durable and visible.
    pub fn commit(mut self) -> CoreResult<SequenceNumber> {
        let manager = self.manager;
        manager.commit_write(&mut self)
    }

    /// Discards every staged write.
    pub fn abort(mut self) -> CoreResult<()> {
        let manager = self.manager;
        manager.abort_write(&mut self)
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if self.txn.is_active() {
            tracing::debug!(txid = %self.txn.id(), "write transaction dropped, aborting");
            self.txn.mark_aborted();
        }
    }
}

impl std::fmt::Debug for WriteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTransaction")
            .field("id", &self.txn.id())
            .field("snapshot", &self.txn.snapshot())
            .field("state", &self.txn.state())
            .field("writes", &self.txn.write_count())
            .finish_non_exhaustive()
    }
}

fn ensure_same_key(before: &PrimaryKey, after: &PrimaryKey) -> CoreResult<()> {
    if before == after {
        Ok(())
    } else {
        Err(CoreError::invalid_operation(format!(
            "update changed primary key {before} to {after}"
        )))
    }
}
