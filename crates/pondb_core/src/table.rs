//! Multi-version record table.
//!
//! Each `(collection, key)` owns a chain of versions ordered by commit
//! sequence. A read at snapshot `s` sees the newest version with
//! `sequence <= s`; a `None` version is a tombstone.

use crate::record::{PrimaryKey, Record};
use crate::types::SequenceNumber;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Version {
    sequence: SequenceNumber,
    record: Option<Record>,
}

type Chains = BTreeMap<PrimaryKey, Vec<Version>>;

/// Committed state of every collection, kept in memory and rebuilt from the
/// WAL on open.
#[derive(Debug, Default)]
pub(crate) struct VersionedTable {
    collections: RwLock<BTreeMap<String, Chains>>,
}

fn visible(chain: &[Version], snapshot: SequenceNumber) -> Option<&Record> {
    chain
        .iter()
        .rev()
        .find(|v| v.sequence <= snapshot)
        .and_then(|v| v.record.as_ref())
}

impl VersionedTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record visible at `snapshot`.
    pub(crate) fn get_at(
        &self,
        collection: &str,
        key: &PrimaryKey,
        snapshot: SequenceNumber,
    ) -> Option<Record> {
        let collections = self.collections.read();
        let chain = collections.get(collection)?.get(key)?;
        visible(chain, snapshot).cloned()
    }

    /// All records visible at `snapshot`, ordered by key.
    pub(crate) fn scan_at(&self, collection: &str, snapshot: SequenceNumber) -> Vec<Record> {
        let collections = self.collections.read();
        collections
            .get(collection)
            .map(|chains| {
                chains
                    .values()
                    .filter_map(|chain| visible(chain, snapshot).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of collections with at least one live record at `snapshot`.
    pub(crate) fn collection_names(&self, snapshot: SequenceNumber) -> Vec<String> {
        let collections = self.collections.read();
        collections
            .iter()
            .filter(|(_, chains)| chains.values().any(|c| visible(c, snapshot).is_some()))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every live record at `snapshot`, grouped by collection.
    pub(crate) fn live_records(&self, snapshot: SequenceNumber) -> Vec<(String, Record)> {
        let collections = self.collections.read();
        collections
            .iter()
            .flat_map(|(name, chains)| {
                chains
                    .values()
                    .filter_map(move |chain| visible(chain, snapshot))
                    .map(move |record| (name.clone(), record.clone()))
            })
            .collect()
    }

    /// Appends a version. `sequence` must not be lower than any version
    /// already in the chain.
    pub(crate) fn apply(
        &self,
        collection: &str,
        key: PrimaryKey,
        record: Option<Record>,
        sequence: SequenceNumber,
    ) {
        let mut collections = self.collections.write();
        let chains = collections.entry(collection.to_string()).or_default();
        let chain = chains.entry(key).or_default();
        match chain.last_mut() {
            Some(last) if last.sequence == sequence => last.record = record,
            _ => chain.push(Version { sequence, record }),
        }
    }

    /// Drops versions no snapshot at or after `horizon` can see.
    pub(crate) fn prune(&self, horizon: SequenceNumber) -> usize {
        let mut collections = self.collections.write();
        let mut dropped = 0;
        for chains in collections.values_mut() {
            chains.retain(|_, chain| {
                if let Some(newest_visible) = chain.iter().rposition(|v| v.sequence <= horizon) {
                    dropped += newest_visible;
                    chain.drain(..newest_visible);
                }
                let dead = chain.len() == 1 && chain[0].record.is_none() && chain[0].sequence <= horizon;
                if dead {
                    dropped += 1;
                }
                !dead
            });
        }
        collections.retain(|_, chains| !chains.is_empty());
        dropped
    }

    /// Total number of stored versions, tombstones included.
    pub(crate) fn version_count(&self) -> usize {
        self.collections
            .read()
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }
}
