//! Database facade.

use crate::config::Config;
use crate::dir::DatabaseDir;
use crate::error::{CoreError, CoreResult};
use crate::query::Query;
use crate::record::{Object, PrimaryKey, Record};
use crate::transaction::{ReadTransaction, TransactionManager, WriteTransaction};
use crate::types::SequenceNumber;
use crate::upsert::UpdatePolicy;
use crate::wal::{encode_all, WalManager};
use parking_lot::{Mutex, RwLock};
use pondb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::Path;
use std::sync::Arc;

/// An open pondb database.
///
/// All committed state lives in the versioned table and is rebuilt from the
/// WAL on open. A file database keeps its WAL in `<dir>/wal.log`; an
/// in-memory database keeps it in a byte buffer.
///
/// # Example
///
/// ```rust
/// use pondb_core::{Database, Filter, Query, Record, UpdatePolicy};
///
/// let db = Database::open_in_memory()?;
/// db.upsert("Frog", Record::new("X").with("age", 45), UpdatePolicy::ReplaceAll)?;
/// db.upsert("Frog", Record::new("X").with("age", 4), UpdatePolicy::ReplaceAll)?;
///
/// let young = db.query(&Query::new("Frog").filter(Filter::lt("age", 10)))?;
/// assert_eq!(young.len(), 1);
/// # Ok::<(), pondb_core::CoreError>(())
/// ```
pub struct Database {
    config: Config,
    /// `None` for databases not backed by a directory, and after close.
    dir: Mutex<Option<DatabaseDir>>,
    txn_manager: Arc<TransactionManager>,
    /// Whether the WAL was empty when opened.
    was_new: bool,
    is_open: RwLock<bool>,
}

impl Database {
    /// Opens a database directory with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if another handle holds the directory lock
    /// (`DatabaseLocked`), the WAL is corrupt, or I/O fails.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a database directory.
    ///
    /// ```rust,no_run
    /// use pondb_core::{Config, Database};
    /// use std::path::Path;
    ///
    /// let config = Config::default().sync_on_commit(false);
    /// let db = Database::open_with_config(Path::new("ponds.db"), config)?;
    /// # Ok::<(), pondb_core::CoreError>(())
    /// ```
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = DatabaseDir::open(path, config.create_if_missing)?;
        let was_new = dir.is_new_database();

        if !config.create_if_missing && was_new {
            return Err(CoreError::invalid_format(
                "database does not exist and create_if_missing is false",
            ));
        }

        if config.error_if_exists && !was_new {
            return Err(CoreError::invalid_format(
                "database already exists and error_if_exists is true",
            ));
        }

        let backend = FileBackend::open_with_create_dirs(&dir.wal_path())?;
        let mut db = Self::open_with_backend(config, Box::new(backend))?;
        tracing::info!(
            path = %dir.path().display(),
            new = was_new,
            committed_seq = %db.committed_seq(),
            "database opened"
        );
        db.dir = Mutex::new(Some(dir));
        Ok(db)
    }

    /// Opens a database whose WAL lives in `wal_backend`.
    ///
    /// Reopening over a backend that already holds a log recovers its
    /// committed state. Checkpoints rewrite the backend in place.
    pub fn open_with_backend(config: Config, wal_backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let was_new = wal_backend.size()? == 0;
        let wal = WalManager::new(wal_backend, config.sync_on_commit);
        let txn_manager = Arc::new(TransactionManager::recover(wal)?);
        tracing::debug!(
            new = was_new,
            committed_seq = %txn_manager.committed_seq(),
            "WAL backend opened"
        );

        Ok(Self {
            config,
            dir: Mutex::new(None),
            txn_manager,
            was_new,
            is_open: RwLock::new(true),
        })
    }

    /// Opens a fresh in-memory database. Its contents are lost when it is
    /// dropped.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Config::default(), Box::new(InMemoryBackend::new()))
    }

    /// True if the WAL was empty when the database was opened.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.was_new
    }

    /// Begins a snapshot read.
    pub fn read(&self) -> CoreResult<ReadTransaction> {
        self.ensure_open()?;
        Ok(self.txn_manager.begin_read())
    }

    /// Begins the write transaction, waiting for any other writer to finish.
    ///
    /// Prefer [`Database::write`], which commits or aborts for you.
    pub fn begin_write(&self) -> CoreResult<WriteTransaction<'_>> {
        self.ensure_open()?;
        Ok(self.txn_manager.begin_write())
    }

    /// Runs `f` in a write transaction.
    ///
    /// Commits if `f` returns `Ok`, aborts if it returns `Err`. May trigger
    /// a checkpoint afterwards when the WAL has outgrown
    /// [`Config::max_wal_size`]; the commit stands even if that checkpoint
    /// fails, so its error is logged rather than returned.
    pub fn write<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> CoreResult<T>,
    {
        let mut txn = self.begin_write()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                if let Err(err) = self.maybe_checkpoint() {
                    tracing::warn!(error = %err, "auto-checkpoint failed");
                }
                Ok(value)
            }
            Err(err) => {
                txn.abort()?;
                Err(err)
            }
        }
    }

    /// Looks up a record by key in a fresh snapshot.
    pub fn find(&self, collection: &str, key: &PrimaryKey) -> CoreResult<Option<Record>> {
        Ok(self.read()?.get(collection, key))
    }

    /// Looks up a typed object.
    pub fn find_object<T: Object>(&self, key: &PrimaryKey) -> CoreResult<Option<T>> {
        self.read()?.get_object(key)
    }

    /// Records matching `query` in a fresh snapshot, ordered by key.
    pub fn query(&self, query: &Query) -> CoreResult<Vec<Record>> {
        Ok(self.read()?.query(query))
    }

    /// Number of records matching `query`.
    pub fn count(&self, query: &Query) -> CoreResult<usize> {
        Ok(self.read()?.count(query))
    }

    /// Upserts one record in its own write transaction.
    ///
    /// On error the transaction is aborted and the store is unchanged.
    pub fn upsert(
        &self,
        collection: &str,
        record: Record,
        policy: UpdatePolicy,
    ) -> CoreResult<Record> {
        self.write(|txn| txn.upsert(collection, record, policy))
    }

    /// Upserts one typed object in its own write transaction.
    pub fn upsert_object<T: Object>(&self, object: &T, policy: UpdatePolicy) -> CoreResult<T> {
        self.write(|txn| txn.upsert_object(object, policy))
    }

    /// Deletes a record in its own write transaction. Returns whether it
    /// existed.
    pub fn delete(&self, collection: &str, key: &PrimaryKey) -> CoreResult<bool> {
        self.write(|txn| txn.delete(collection, key))
    }

    /// Deletes every record matching `query`. Returns how many were deleted.
    pub fn delete_where(&self, query: &Query) -> CoreResult<usize> {
        self.write(|txn| txn.delete_where(query))
    }

    /// Names of non-empty collections.
    pub fn collections(&self) -> CoreResult<Vec<String>> {
        Ok(self.read()?.collections())
    }

    /// Rewrites the WAL to hold only live records.
    ///
    /// File databases write the new log beside the old one and rename it
    /// into place.
    pub fn checkpoint(&self) -> CoreResult<SequenceNumber> {
        // held so close cannot release the directory mid-checkpoint
        let is_open = self.is_open.read();
        if !*is_open {
            return Err(CoreError::DatabaseClosed);
        }
        let dir = self.dir.lock();
        match dir.as_ref() {
            Some(dir) => self.txn_manager.checkpoint_with(|wal, records| {
                let backend = dir.replace_wal(&encode_all(records)?)?;
                wal.replace_backend(Box::new(backend));
                Ok(())
            }),
            None => self
                .txn_manager
                .checkpoint_with(|wal, records| wal.rewrite(records)),
        }
    }

    fn maybe_checkpoint(&self) -> CoreResult<()> {
        let limit = self.config.max_wal_size;
        if limit == 0 {
            return Ok(());
        }
        let size = self.wal_size()?;
        if size > limit {
            tracing::debug!(size, limit, "WAL over size limit");
            self.checkpoint()?;
        }
        Ok(())
    }

    /// Current WAL size in bytes.
    pub fn wal_size(&self) -> CoreResult<u64> {
        self.txn_manager.wal().size()
    }

    /// Returns the current committed sequence number.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.txn_manager.committed_seq()
    }

    /// The transaction manager, for callers that drive transactions
    /// directly.
    #[must_use]
    pub fn transaction_manager(&self) -> &Arc<TransactionManager> {
        &self.txn_manager
    }

    /// Closes the database and releases the directory lock. Further
    /// operations fail with [`CoreError::DatabaseClosed`]. Closing twice is a
    /// no-op.
    pub fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }
        *is_open = false;
        self.dir.lock().take();
        tracing::info!(committed_seq = %self.committed_seq(), "database closed");
        Ok(())
    }

    /// Checks if the database is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::DatabaseClosed)
        }
    }

    /// Returns database configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.dir.lock().as_ref().map(|dir| dir.path().to_path_buf()))
            .field("is_open", &self.is_open())
            .field("committed_seq", &self.committed_seq())
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Cmp, Filter};
    use pondb_codec::Value;

    fn create_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn open_in_memory() {
        let db = create_db();
        assert!(db.is_open());
        assert!(db.is_new());
        assert_eq!(db.committed_seq(), SequenceNumber::new(0));
    }

    #[test]
    fn write_error_aborts() {
        let db = create_db();
        let result: CoreResult<()> = db.write(|txn| {
            txn.put("Frog", Record::new("X"))?;
            Err(CoreError::invalid_operation("changed my mind"))
        });
        assert!(result.is_err());
        assert_eq!(db.find("Frog", &"X".into()).unwrap(), None);
        assert_eq!(db.committed_seq(), SequenceNumber::new(0));
    }

    #[test]
    fn closed_database_rejects_operations() {
        let db = create_db();
        db.close().unwrap();
        assert!(matches!(
            db.find("Frog", &"X".into()),
            Err(CoreError::DatabaseClosed)
        ));
        assert!(matches!(
            db.upsert("Frog", Record::new("X"), UpdatePolicy::ReplaceAll),
            Err(CoreError::DatabaseClosed)
        ));
        db.close().unwrap();
    }

    #[test]
    fn reopen_shared_backend_recovers() {
        let backend = InMemoryBackend::new();
        {
            let db = Database::open_with_backend(Config::default(), Box::new(backend.clone())).unwrap();
            db.upsert("Frog", Record::new("X").with("age", 45), UpdatePolicy::ReplaceAll)
                .unwrap();
            db.upsert("Frog", Record::new("X").with("age", 4), UpdatePolicy::ReplaceAll)
                .unwrap();
        }
        let db = Database::open_with_backend(Config::default(), Box::new(backend)).unwrap();
        assert!(!db.is_new());
        let frog = db.find("Frog", &"X".into()).unwrap().unwrap();
        assert_eq!(frog.get("age"), Some(&Value::Integer(4)));
    }

    #[test]
    fn collections_lists_non_empty() {
        let db = create_db();
        db.upsert("Frog", Record::new("X"), UpdatePolicy::ReplaceAll).unwrap();
        db.upsert("Pond", Record::new("P"), UpdatePolicy::ReplaceAll).unwrap();
        db.delete("Pond", &"P".into()).unwrap();
        assert_eq!(db.collections().unwrap(), vec!["Frog".to_string()]);
    }

    #[test]
    fn auto_checkpoint_bounds_wal() {
        let config = Config::default().max_wal_size(2048);
        let db = Database::open_with_backend(config, Box::new(InMemoryBackend::new())).unwrap();
        for n in 0..200 {
            db.upsert("N", Record::new(1).with("n", n), UpdatePolicy::ReplaceAll)
                .unwrap();
        }
        assert!(db.wal_size().unwrap() <= 2048);
        let record = db.find("N", &PrimaryKey::from(1)).unwrap().unwrap();
        assert_eq!(record.require_integer("n").unwrap(), 199);
    }

    #[test]
    fn count_query() {
        let db = create_db();
        db.write(|txn| {
            txn.put(
                "Frog",
                Record::new("A").with("ponds", Value::dictionary([("a", 1), ("b", 2)])),
            )?;
            txn.put("Frog", Record::new("B").with("ponds", Value::dictionary([("a", 1)])))?;
            Ok(())
        })
        .unwrap();
        let q = Query::new("Frog").filter(Filter::count("ponds", Cmp::Gt, 1));
        let found = db.query(&q).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key(), &PrimaryKey::from("A"));
    }
}
