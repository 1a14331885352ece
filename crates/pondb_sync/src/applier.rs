//! Landing downloaded changes in the local database.

use crate::error::SyncResult;
use crate::source::RemoteChange;
use pondb_core::{Database, UpdatePolicy};

/// Counts from one applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Records inserted or replaced.
    pub upserted: usize,
    /// Records deleted. Deletes of absent keys are not counted.
    pub deleted: usize,
}

impl ApplyStats {
    /// Total changes that took effect.
    #[must_use]
    pub fn total(&self) -> usize {
        self.upserted + self.deleted
    }
}

/// Applies a batch in a single write transaction.
///
/// Remote records replace local ones wholesale. Either the whole batch
/// commits or none of it does.
pub fn apply_changes(db: &Database, changes: &[RemoteChange]) -> SyncResult<ApplyStats> {
    if changes.is_empty() {
        return Ok(ApplyStats::default());
    }
    let stats = db.write(|txn| {
        let mut stats = ApplyStats::default();
        for change in changes {
            match change {
                RemoteChange::Upsert { collection, record } => {
                    txn.upsert(collection, record.clone(), UpdatePolicy::ReplaceAll)?;
                    stats.upserted += 1;
                }
                RemoteChange::Delete { collection, key } => {
                    if txn.delete(collection, key)? {
                        stats.deleted += 1;
                    }
                }
            }
        }
        Ok(stats)
    })?;
    tracing::debug!(
        upserted = stats.upserted,
        deleted = stats.deleted,
        committed_seq = %db.committed_seq(),
        "remote changes applied"
    );
    Ok(stats)
}
