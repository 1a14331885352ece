//! WAL record types and the frame envelope.

use crate::error::{CoreError, CoreResult};
use crate::record::{PrimaryKey, Record};
use crate::types::{SequenceNumber, TransactionId};
use pondb_codec::{from_cbor, to_cbor};
use serde::{Deserialize, Serialize};

/// Magic bytes opening every WAL frame.
pub const WAL_MAGIC: [u8; 4] = *b"PWAL";

/// Current WAL format version.
pub const WAL_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub(crate) const HEADER_SIZE: usize = 11;

pub(crate) const CRC_SIZE: usize = 4;

/// Type tag stored in a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WalRecordType {
    /// Begin a transaction.
    Begin = 1,
    /// Store a record.
    Put = 2,
    /// Delete a record.
    Delete = 3,
    /// Commit a transaction.
    Commit = 4,
    /// Checkpoint marker.
    Checkpoint = 5,
}

impl WalRecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Begin),
            2 => Some(Self::Put),
            3 => Some(Self::Delete),
            4 => Some(Self::Commit),
            5 => Some(Self::Checkpoint),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A logged database operation.
///
/// Records of one transaction are only written at commit, so a `Begin`
/// without a matching `Commit` can only come from a torn tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalRecord {
    /// Begin a transaction.
    Begin {
        /// Transaction ID.
        txid: TransactionId,
    },

    /// Insert or replace a record.
    Put {
        /// Transaction ID.
        txid: TransactionId,
        /// Collection name.
        collection: String,
        /// Full record as stored.
        record: Record,
    },

    /// Delete a record.
    Delete {
        /// Transaction ID.
        txid: TransactionId,
        /// Collection name.
        collection: String,
        /// Deleted key.
        key: PrimaryKey,
    },

    /// Commit a transaction.
    Commit {
        /// Transaction ID.
        txid: TransactionId,
        /// Sequence number assigned to this commit.
        sequence: SequenceNumber,
    },

    /// Written after a checkpoint rewrite.
    Checkpoint {
        /// Committed sequence the checkpoint captured.
        sequence: SequenceNumber,
    },
}

impl WalRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> WalRecordType {
        match self {
            Self::Begin { .. } => WalRecordType::Begin,
            Self::Put { .. } => WalRecordType::Put,
            Self::Delete { .. } => WalRecordType::Delete,
            Self::Commit { .. } => WalRecordType::Commit,
            Self::Checkpoint { .. } => WalRecordType::Checkpoint,
        }
    }

    /// Returns the transaction ID if this record belongs to one.
    #[must_use]
    pub fn txid(&self) -> Option<TransactionId> {
        match self {
            Self::Begin { txid }
            | Self::Put { txid, .. }
            | Self::Delete { txid, .. }
            | Self::Commit { txid, .. } => Some(*txid),
            Self::Checkpoint { .. } => None,
        }
    }

    /// Encodes the record as one complete frame.
    pub fn encode_frame(&self) -> CoreResult<Vec<u8>> {
        let payload = to_cbor(self)?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_operation("WAL record payload too large"))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&WAL_MAGIC);
        frame.extend_from_slice(&WAL_VERSION.to_le_bytes());
        frame.push(self.record_type().as_byte());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        let crc = crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }

    /// Decodes a payload and checks it against the header's type tag.
    pub fn decode_payload(record_type: WalRecordType, payload: &[u8]) -> CoreResult<Self> {
        let record: Self = from_cbor(payload)
            .map_err(|e| CoreError::wal_corruption(format!("undecodable payload: {e}")))?;
        if record.record_type() != record_type {
            return Err(CoreError::wal_corruption(format!(
                "header says {record_type:?}, payload is {:?}",
                record.record_type()
            )));
        }
        Ok(record)
    }
}

const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 == 1 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
};

/// CRC-32 (IEEE) of `data`.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    !data.iter().fold(!0u32, |c, &b| {
        CRC32_TABLE[((c ^ u32::from(b)) & 0xFF) as usize] ^ (c >> 8)
    })
}
