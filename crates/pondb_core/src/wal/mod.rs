//! Write-ahead log.
//!
//! Every frame is
//! `| magic "PWAL" | version u16 LE | type u8 | len u32 LE | CBOR payload | crc32 LE |`,
//! with the CRC taken over everything before it.

mod record;
mod writer;

pub use record::{WalRecord, WalRecordType, WAL_MAGIC, WAL_VERSION};
pub use writer::{WalManager, WalScan};

pub(crate) use writer::encode_all;
