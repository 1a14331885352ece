//! Transaction bookkeeping shared by the write path.

use crate::error::{CoreError, CoreResult};
use crate::record::{PrimaryKey, Record};
use crate::types::{SequenceNumber, TransactionId};
use std::collections::BTreeMap;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

/// A staged change to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingWrite {
    /// Store this record.
    Put(Record),
    /// Remove the record.
    Delete,
}

/// Pending writes of one transaction, grouped by collection.
#[derive(Debug)]
pub(crate) struct Transaction {
    id: TransactionId,
    snapshot: SequenceNumber,
    state: TransactionState,
    writes: BTreeMap<String, BTreeMap<PrimaryKey, PendingWrite>>,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId, snapshot: SequenceNumber) -> Self {
        Self {
            id,
            snapshot,
            state: TransactionState::Active,
            writes: BTreeMap::new(),
        }
    }

    pub(crate) fn id(&self) -> TransactionId {
        self.id
    }

    pub(crate) fn snapshot(&self) -> SequenceNumber {
        self.snapshot
    }

    pub(crate) fn state(&self) -> TransactionState {
        self.state
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    pub(crate) fn put(&mut self, collection: &str, record: Record) -> CoreResult<()> {
        self.ensure_active()?;
        self.writes
            .entry(collection.to_string())
            .or_default()
            .insert(record.key().clone(), PendingWrite::Put(record));
        Ok(())
    }

    pub(crate) fn delete(&mut self, collection: &str, key: PrimaryKey) -> CoreResult<()> {
        self.ensure_active()?;
        self.writes
            .entry(collection.to_string())
            .or_default()
            .insert(key, PendingWrite::Delete);
        Ok(())
    }

    pub(crate) fn pending(&self, collection: &str, key: &PrimaryKey) -> Option<&PendingWrite> {
        self.writes.get(collection)?.get(key)
    }

    /// Pending writes of one collection, in key order.
    pub(crate) fn pending_in(
        &self,
        collection: &str,
    ) -> impl Iterator<Item = (&PrimaryKey, &PendingWrite)> {
        self.writes.get(collection).into_iter().flatten()
    }

    /// Every pending write as `(collection, key, write)`.
    pub(crate) fn pending_writes(
        &self,
    ) -> impl Iterator<Item = (&str, &PrimaryKey, &PendingWrite)> {
        self.writes.iter().flat_map(|(collection, writes)| {
            writes.iter().map(move |(key, w)| (collection.as_str(), key, w))
        })
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.values().map(BTreeMap::len).sum()
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = TransactionState::Committed;
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.state = TransactionState::Aborted;
        self.writes.clear();
    }

    pub(crate) fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(CoreError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::Aborted => {
                Err(CoreError::invalid_operation("transaction already aborted"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_txn() -> Transaction {
        Transaction::new(TransactionId::new(1), SequenceNumber::new(0))
    }

    #[test]
    fn new_transaction_is_active() {
        let txn = create_txn();
        assert!(txn.is_active());
        assert_eq!(txn.state(), TransactionState::Active);
    }

    #[test]
    fn later_write_to_same_key_wins() {
        let mut txn = create_txn();
        txn.put("Frog", Record::new("X").with("age", 45)).unwrap();
        txn.delete("Frog", "X".into()).unwrap();
        assert_eq!(txn.write_count(), 1);
        assert_eq!(
            txn.pending("Frog", &"X".into()),
            Some(&PendingWrite::Delete)
        );
    }

    #[test]
    fn pending_in_filters_collection() {
        let mut txn = create_txn();
        txn.put("Frog", Record::new("X")).unwrap();
        txn.put("Pond", Record::new("X")).unwrap();
        txn.put("Frog", Record::new("Y")).unwrap();
        let keys: Vec<_> = txn.pending_in("Frog").map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![PrimaryKey::from("X"), PrimaryKey::from("Y")]);
    }

    #[test]
    fn cannot_write_after_commit() {
        let mut txn = create_txn();
        txn.mark_committed();
        assert!(txn.put("Frog", Record::new("X")).is_err());
    }

    #[test]
    fn abort_discards_writes() {
        let mut txn = create_txn();
        txn.put("Frog", Record::new("X")).unwrap();
        txn.mark_aborted();
        assert_eq!(txn.write_count(), 0);
        assert!(txn.delete("Frog", "X".into()).is_err());
    }
}
