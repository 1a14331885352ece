//! Remote sources of changes.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use pondb_core::{PrimaryKey, Record};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One change reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteChange {
    /// The remote holds this record.
    Upsert {
        /// Collection name.
        collection: String,
        /// Full record.
        record: Record,
    },
    /// The remote deleted this record.
    Delete {
        /// Collection name.
        collection: String,
        /// Deleted key.
        key: PrimaryKey,
    },
}

impl RemoteChange {
    /// An upsert change.
    pub fn upsert(collection: impl Into<String>, record: Record) -> Self {
        Self::Upsert {
            collection: collection.into(),
            record,
        }
    }

    /// A delete change.
    pub fn delete(collection: impl Into<String>, key: impl Into<PrimaryKey>) -> Self {
        Self::Delete {
            collection: collection.into(),
            key: key.into(),
        }
    }
}

/// Where downloaded changes come from.
///
/// Implemented by transports; the open logic only needs one batch.
pub trait RemoteSource: Send + Sync {
    /// Fetches every change the local database is missing.
    fn fetch(&self) -> impl Future<Output = SyncResult<Vec<RemoteChange>>> + Send;
}

/// A source serving a fixed batch, for tests and demos.
#[derive(Debug, Default)]
pub struct MockSource {
    changes: Mutex<Vec<RemoteChange>>,
    delay: Duration,
    failure: Option<String>,
    fetches: AtomicUsize,
}

impl MockSource {
    /// A source that returns `changes` on every fetch.
    pub fn new(changes: Vec<RemoteChange>) -> Self {
        Self {
            changes: Mutex::new(changes),
            ..Self::default()
        }
    }

    /// Waits `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fails every fetch with a retryable source error.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Replaces the batch served by later fetches.
    pub fn set_changes(&self, changes: Vec<RemoteChange>) {
        *self.changes.lock() = changes;
    }

    /// Number of fetches started.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RemoteSource for MockSource {
    async fn fetch(&self) -> SyncResult<Vec<RemoteChange>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(message) => Err(SyncError::source_retryable(message.clone())),
            None => Ok(self.changes.lock().clone()),
        }
    }
}
