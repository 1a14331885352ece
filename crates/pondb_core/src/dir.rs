//! Database directory layout and locking.
//!
//! ```text
//! <db_path>/
//! ├─ LOCK       # advisory lock, one process at a time
//! └─ wal.log    # write-ahead log, the only data file
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use pondb_storage::FileBackend;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const WAL_FILE: &str = "wal.log";
/// Checkpoint output before it is renamed over the live log.
const WAL_TEMP: &str = "wal.log.tmp";

/// An opened database directory. Holds the exclusive lock until dropped.
#[derive(Debug)]
pub(crate) struct DatabaseDir {
    path: PathBuf,
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens (or creates) the directory and takes the lock.
    ///
    /// Fails with [`CoreError::DatabaseLocked`] if another handle holds it.
    pub(crate) fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "database directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }

        // leftover from a checkpoint interrupted before its rename
        let temp = path.join(WAL_TEMP);
        if temp.exists() {
            tracing::warn!(path = %temp.display(), "removing stale checkpoint file");
            fs::remove_file(&temp)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn wal_path(&self) -> PathBuf {
        self.path.join(WAL_FILE)
    }

    /// True when no log exists yet or it is empty.
    pub(crate) fn is_new_database(&self) -> bool {
        fs::metadata(self.wal_path()).map_or(true, |m| m.len() == 0)
    }

    /// Atomically replaces the log with `bytes` and returns a backend over
    /// the new file.
    ///
    /// The bytes go to a temporary file that is synced and then renamed over
    /// `wal.log`, so a crash leaves either the old or the new log.
    pub(crate) fn replace_wal(&self, bytes: &[u8]) -> CoreResult<FileBackend> {
        let temp = self.path.join(WAL_TEMP);
        {
            let mut file = File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp, self.wal_path())?;
        self.sync_directory()?;
        Ok(FileBackend::open(&self.wal_path())?)
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> CoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> CoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pondb_storage::StorageBackend;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("new_db");

        let dir = DatabaseDir::open(&db_path, true).unwrap();
        assert!(db_path.is_dir());
        assert!(dir.is_new_database());
        assert_eq!(dir.path(), db_path);
    }

    #[test]
    fn open_fails_if_not_exists_and_no_create() {
        let temp = tempdir().unwrap();
        let result = DatabaseDir::open(&temp.path().join("nonexistent"), false);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("locked_db");

        let _dir1 = DatabaseDir::open(&db_path, true).unwrap();
        let result = DatabaseDir::open(&db_path, true);
        assert!(matches!(result, Err(CoreError::DatabaseLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("reopen_db");

        {
            let _dir = DatabaseDir::open(&db_path, true).unwrap();
        }
        let _dir2 = DatabaseDir::open(&db_path, true).unwrap();
    }

    #[test]
    fn replace_wal_swaps_contents() {
        let temp = tempdir().unwrap();
        let dir = DatabaseDir::open(temp.path(), true).unwrap();
        fs::write(dir.wal_path(), b"old contents").unwrap();
        assert!(!dir.is_new_database());

        let backend = dir.replace_wal(b"new").unwrap();
        assert_eq!(backend.read_all().unwrap(), b"new");
        assert_eq!(fs::read(dir.wal_path()).unwrap(), b"new");
        assert!(!temp.path().join(WAL_TEMP).exists());
    }

    #[test]
    fn stale_temp_file_removed_on_open() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(WAL_TEMP), b"half a checkpoint").unwrap();
        let _dir = DatabaseDir::open(temp.path(), true).unwrap();
        assert!(!temp.path().join(WAL_TEMP).exists());
    }
}
