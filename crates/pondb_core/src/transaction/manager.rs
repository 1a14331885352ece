//! Transaction manager.

use super::state::{PendingWrite, Transaction};
use super::{ReadTransaction, WriteTransaction};
use crate::error::{CoreError, CoreResult};
use crate::record::{PrimaryKey, Record};
use crate::table::VersionedTable;
use crate::types::{SequenceNumber, TransactionId};
use crate::wal::{WalManager, WalRecord};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Coordinates the single writer, snapshot readers, the WAL and the
/// versioned table.
///
/// Commit order is: WAL `Begin`, the transaction's `Put`/`Delete` records,
/// `Commit`, flush; then apply to the table; then publish the new committed
/// sequence. A reader that began earlier keeps its snapshot.
pub struct TransactionManager {
    wal: WalManager,
    table: VersionedTable,
    next_txid: AtomicU64,
    committed_seq: AtomicU64,
    /// Held by the active write transaction for its whole lifetime.
    write_lock: Mutex<()>,
    /// Snapshot of every live read transaction.
    readers: Mutex<BTreeMap<TransactionId, SequenceNumber>>,
}

type ReplayOp = (String, PrimaryKey, Option<Record>);

impl TransactionManager {
    /// Creates a manager over an empty WAL.
    pub fn new(wal: WalManager) -> Self {
        Self::with_state(wal, VersionedTable::new(), 1, 0)
    }

    fn with_state(wal: WalManager, table: VersionedTable, next_txid: u64, committed: u64) -> Self {
        Self {
            wal,
            table,
            next_txid: AtomicU64::new(next_txid),
            committed_seq: AtomicU64::new(committed),
            write_lock: Mutex::new(()),
            readers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Rebuilds committed state from the WAL.
    ///
    /// Transactions without a `Commit` record are discarded. A torn tail is
    /// cut off so later appends start on a frame boundary.
    pub fn recover(wal: WalManager) -> CoreResult<Self> {
        let scan = wal.scan()?;
        let size = wal.size()?;
        if scan.valid_len < size {
            tracing::warn!(
                valid_len = scan.valid_len,
                size,
                "discarding torn WAL tail"
            );
            wal.truncate(scan.valid_len)?;
        }

        let table = VersionedTable::new();
        let mut open: HashMap<TransactionId, Vec<ReplayOp>> = HashMap::new();
        let mut max_txid = 0;
        let mut committed = 0;
        let mut replayed = 0usize;

        for (offset, record) in scan.records {
            if let Some(txid) = record.txid() {
                max_txid = max_txid.max(txid.as_u64());
            }
            match record {
                WalRecord::Begin { txid } => {
                    open.insert(txid, Vec::new());
                }
                WalRecord::Put {
                    txid,
                    collection,
                    record,
                } => {
                    let key = record.key().clone();
                    ops_for(&mut open, txid, offset)?.push((collection, key, Some(record)));
                }
                WalRecord::Delete {
                    txid,
                    collection,
                    key,
                } => {
                    ops_for(&mut open, txid, offset)?.push((collection, key, None));
                }
                WalRecord::Commit { txid, sequence } => {
                    let ops = open.remove(&txid).ok_or_else(|| {
                        CoreError::wal_corruption(format!(
                            "commit of unknown transaction {txid} at offset {offset}"
                        ))
                    })?;
                    for (collection, key, record) in ops {
                        table.apply(&collection, key, record, sequence);
                    }
                    committed = committed.max(sequence.as_u64());
                    replayed += 1;
                }
                WalRecord::Checkpoint { sequence } => {
                    committed = committed.max(sequence.as_u64());
                }
            }
        }

        tracing::debug!(
            replayed,
            discarded = open.len(),
            committed_seq = committed,
            "WAL recovery complete"
        );
        Ok(Self::with_state(wal, table, max_txid + 1, committed))
    }

    pub(crate) fn table(&self) -> &VersionedTable {
        &self.table
    }

    /// The write-ahead log.
    pub fn wal(&self) -> &WalManager {
        &self.wal
    }

    fn allocate_txid(&self) -> TransactionId {
        TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst))
    }

    /// Begins a read transaction at the current committed sequence.
    pub fn begin_read(self: &Arc<Self>) -> ReadTransaction {
        let id = self.allocate_txid();
        let snapshot = {
            let mut readers = self.readers.lock();
            let snapshot = self.committed_seq();
            readers.insert(id, snapshot);
            snapshot
        };
        ReadTransaction::new(id, snapshot, Arc::clone(self))
    }

    pub(crate) fn release_reader(&self, id: TransactionId) {
        self.readers.lock().remove(&id);
    }

    /// Begins the write transaction, blocking while another one is active.
    pub fn begin_write(&self) -> WriteTransaction<'_> {
        let guard = self.write_lock.lock();
        let txn = Transaction::new(self.allocate_txid(), self.committed_seq());
        WriteTransaction::new(txn, self, guard)
    }

    /// Commits a write transaction.
    ///
    /// After this returns the writes are durable and visible to new readers.
    /// A transaction with no writes commits without touching the WAL.
    pub fn commit_write(&self, wtxn: &mut WriteTransaction<'_>) -> CoreResult<SequenceNumber> {
        let txn = wtxn.inner();
        txn.ensure_active()?;

        let write_count = txn.write_count();
        if write_count == 0 {
            wtxn.inner_mut().mark_committed();
            return Ok(self.committed_seq());
        }

        let txid = txn.id();
        let sequence = self.committed_seq().next();

        let mut records = Vec::with_capacity(write_count + 2);
        records.push(WalRecord::Begin { txid });
        for (collection, key, write) in txn.pending_writes() {
            records.push(match write {
                PendingWrite::Put(record) => WalRecord::Put {
                    txid,
                    collection: collection.to_string(),
                    record: record.clone(),
                },
                PendingWrite::Delete => WalRecord::Delete {
                    txid,
                    collection: collection.to_string(),
                    key: key.clone(),
                },
            });
        }
        records.push(WalRecord::Commit { txid, sequence });

        let wal_end = self.wal.size()?;
        if let Err(err) = self.wal.append_batch(&records) {
            if let Err(cleanup) = self.wal.truncate(wal_end) {
                tracing::warn!(error = %cleanup, "could not drop partial WAL append");
            }
            wtxn.inner_mut().mark_aborted();
            return Err(err);
        }

        for (collection, key, write) in txn.pending_writes() {
            let record = match write {
                PendingWrite::Put(record) => Some(record.clone()),
                PendingWrite::Delete => None,
            };
            self.table.apply(collection, key.clone(), record, sequence);
        }

        self.committed_seq.store(sequence.as_u64(), Ordering::SeqCst);
        wtxn.inner_mut().mark_committed();

        tracing::debug!(%txid, %sequence, writes = write_count, "transaction committed");
        Ok(sequence)
    }

    /// Aborts a write transaction, discarding its writes.
    pub fn abort_write(&self, wtxn: &mut WriteTransaction<'_>) -> CoreResult<()> {
        let txn = wtxn.inner_mut();
        txn.ensure_active()?;
        tracing::debug!(txid = %txn.id(), writes = txn.write_count(), "transaction aborted");
        txn.mark_aborted();
        Ok(())
    }

    /// Returns the current committed sequence number.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    /// Number of live read transactions.
    #[must_use]
    pub fn active_readers(&self) -> usize {
        self.readers.lock().len()
    }

    /// Rewrites the WAL as a single transaction holding every live record,
    /// then drops versions no reader can see.
    ///
    /// `install` receives the WAL and the new log contents and must replace
    /// the old log with them. It runs under the write lock.
    pub fn checkpoint_with<F>(&self, install: F) -> CoreResult<SequenceNumber>
    where
        F: FnOnce(&WalManager, &[WalRecord]) -> CoreResult<()>,
    {
        let _guard = self.write_lock.lock();
        let sequence = self.committed_seq();
        let txid = self.allocate_txid();

        let live = self.table.live_records(sequence);
        let live_count = live.len();
        let mut records = Vec::with_capacity(live_count + 3);
        records.push(WalRecord::Begin { txid });
        records.extend(
            live.into_iter()
                .map(|(collection, record)| WalRecord::Put {
                    txid,
                    collection,
                    record,
                }),
        );
        records.push(WalRecord::Commit { txid, sequence });
        records.push(WalRecord::Checkpoint { sequence });

        install(&self.wal, &records)?;

        let horizon = self
            .readers
            .lock()
            .values()
            .copied()
            .min()
            .map_or(sequence, |oldest| oldest.min(sequence));
        let pruned = self.table.prune(horizon);

        tracing::info!(%sequence, records = live_count, pruned, "checkpoint complete");
        Ok(sequence)
    }

    /// Total stored versions, tombstones included.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.table.version_count()
    }
}

fn ops_for(
    open: &mut HashMap<TransactionId, Vec<ReplayOp>>,
    txid: TransactionId,
    offset: u64,
) -> CoreResult<&mut Vec<ReplayOp>> {
    open.get_mut(&txid).ok_or_else(|| {
        CoreError::wal_corruption(format!(
            "operation for {txid} at offset {offset} has no begin record"
        ))
    })
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("committed_seq", &self.committed_seq())
            .field("active_readers", &self.active_readers())
            .finish_non_exhaustive()
    }
}
