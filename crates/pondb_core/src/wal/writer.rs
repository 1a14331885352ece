//! WAL append and scan.

use crate::error::{CoreError, CoreResult};
use crate::wal::record::{crc32, WalRecord, WalRecordType, CRC_SIZE, HEADER_SIZE, WAL_MAGIC, WAL_VERSION};
use parking_lot::Mutex;
use pondb_storage::StorageBackend;

/// Result of scanning the log from the start.
#[derive(Debug, Default)]
pub struct WalScan {
    /// Decoded records with their frame offsets.
    pub records: Vec<(u64, WalRecord)>,
    /// Length of the valid prefix. Anything after it is a torn tail.
    pub valid_len: u64,
}

/// Owns the WAL backend and serializes access to it.
pub struct WalManager {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
}

impl WalManager {
    /// Creates a WAL manager over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
        }
    }

    /// Appends one record. Returns its offset.
    pub fn append(&self, record: &WalRecord) -> CoreResult<u64> {
        let frame = record.encode_frame()?;
        Ok(self.backend.lock().append(&frame)?)
    }

    /// Appends a batch of records with a single backend write, then flushes
    /// (and syncs, if configured).
    pub fn append_batch(&self, records: &[WalRecord]) -> CoreResult<u64> {
        let buf = encode_all(records)?;
        let mut backend = self.backend.lock();
        let offset = backend.append(&buf)?;
        backend.flush()?;
        if self.sync_on_commit {
            backend.sync()?;
        }
        Ok(offset)
    }

    /// Returns the current WAL size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Discards everything after `offset`.
    pub fn truncate(&self, offset: u64) -> CoreResult<()> {
        self.backend.lock().truncate(offset)?;
        Ok(())
    }

    /// Replaces the log contents with `records`.
    ///
    /// `records` must be a committed checkpoint of the current log, so the
    /// old log followed by `records` replays to the same state. The new
    /// contents are first appended after the old log; the old log is only
    /// dropped once that append has gone through. If the final overwrite
    /// still fails, the previous log is written back before the error is
    /// returned.
    ///
    /// Not crash-safe on its own; file databases swap in a freshly written
    /// file instead (see [`WalManager::replace_backend`]).
    pub fn rewrite(&self, records: &[WalRecord]) -> CoreResult<()> {
        let buf = encode_all(records)?;
        let mut backend = self.backend.lock();
        let previous = backend.read_all()?;
        let old_len = previous.len() as u64;

        let trial = backend
            .append(&buf)
            .and_then(|_| backend.flush())
            .map_err(CoreError::from);
        if let Err(err) = trial {
            if let Err(cleanup) = backend.truncate(old_len) {
                tracing::warn!(error = %cleanup, "could not drop partial WAL rewrite");
            }
            return Err(err);
        }

        if let Err(err) = overwrite(&mut **backend, &buf) {
            match overwrite(&mut **backend, &previous) {
                Ok(()) => tracing::warn!(error = %err, "WAL rewrite failed, previous log restored"),
                Err(restore) => {
                    tracing::error!(error = %restore, "could not restore WAL after failed rewrite");
                }
            }
            return Err(err);
        }
        Ok(())
    }

    /// Switches to a new backend that already holds a complete log.
    pub fn replace_backend(&self, backend: Box<dyn StorageBackend>) {
        *self.backend.lock() = backend;
    }

    /// Reads and validates every frame.
    ///
    /// A frame cut short by the end of the log ends the scan cleanly. Bad
    /// magic, an unknown version or type, or a checksum mismatch is fatal.
    pub fn scan(&self) -> CoreResult<WalScan> {
        let bytes = self.backend.lock().read_all()?;
        scan_bytes(&bytes)
    }

    /// Reads all records, ignoring any torn tail.
    pub fn read_all(&self) -> CoreResult<Vec<(u64, WalRecord)>> {
        Ok(self.scan()?.records)
    }
}

fn overwrite(backend: &mut dyn StorageBackend, bytes: &[u8]) -> CoreResult<()> {
    backend.truncate(0)?;
    backend.append(bytes)?;
    backend.flush()?;
    backend.sync()?;
    Ok(())
}

/// Encodes records back to back.
pub(crate) fn encode_all(records: &[WalRecord]) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    for record in records {
        buf.extend_from_slice(&record.encode_frame()?);
    }
    Ok(buf)
}

fn scan_bytes(bytes: &[u8]) -> CoreResult<WalScan> {
    let mut scan = WalScan::default();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let rest = &bytes[pos..];
        if rest.len() < HEADER_SIZE {
            tracing::debug!(offset = pos, "torn WAL header at tail");
            break;
        }
        if rest[..4] != WAL_MAGIC {
            return Err(CoreError::wal_corruption(format!("bad magic at offset {pos}")));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version != WAL_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported WAL version {version} at offset {pos}"
            )));
        }
        let record_type = WalRecordType::from_byte(rest[6]).ok_or_else(|| {
            CoreError::wal_corruption(format!("unknown record type {} at offset {pos}", rest[6]))
        })?;
        let len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
        let frame_len = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < frame_len {
            tracing::debug!(offset = pos, "torn WAL frame at tail");
            break;
        }

        let body = &rest[..HEADER_SIZE + len];
        let mut crc_bytes = [0u8; CRC_SIZE];
        crc_bytes.copy_from_slice(&rest[HEADER_SIZE + len..frame_len]);
        let expected = u32::from_le_bytes(crc_bytes);
        let actual = crc32(body);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch { expected, actual });
        }

        let record = WalRecord::decode_payload(record_type, &body[HEADER_SIZE..])?;
        scan.records.push((pos as u64, record));
        pos += frame_len;
        scan.valid_len = pos as u64;
    }

    Ok(scan)
}
