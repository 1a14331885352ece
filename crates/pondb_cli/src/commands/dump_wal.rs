//! `pondb dump-wal`

use super::Format;
use crate::error::CliResult;
use crate::json::record_to_json;
use pondb_core::{Database, WalRecord};
use serde_json::json;
use std::path::Path;

pub fn run(path: &Path, limit: Option<usize>, offset: u64, format: Format) -> CliResult<()> {
    let db = Database::open(path)?;
    let records = db.transaction_manager().wal().read_all()?;
    let selected = records
        .iter()
        .filter(|(at, _)| *at >= offset)
        .take(limit.unwrap_or(usize::MAX));

    for (at, record) in selected {
        match format {
            Format::Text => println!("{at:>10}  {}", describe(record)),
            Format::Json => println!("{}", to_json(*at, record)),
        }
    }
    Ok(())
}

fn describe(record: &WalRecord) -> String {
    match record {
        WalRecord::Begin { txid } => format!("BEGIN      {txid}"),
        WalRecord::Put {
            txid,
            collection,
            record,
        } => format!("PUT        {txid} {collection}/{}", record.key()),
        WalRecord::Delete {
            txid,
            collection,
            key,
        } => format!("DELETE     {txid} {collection}/{key}"),
        WalRecord::Commit { txid, sequence } => format!("COMMIT     {txid} {sequence}"),
        WalRecord::Checkpoint { sequence } => format!("CHECKPOINT {sequence}"),
    }
}

fn to_json(offset: u64, record: &WalRecord) -> serde_json::Value {
    let mut entry = json!({
        "offset": offset,
        "type": format!("{:?}", record.record_type()),
    });
    match record {
        WalRecord::Begin { txid } => entry["txid"] = json!(txid.as_u64()),
        WalRecord::Put {
            txid,
            collection,
            record,
        } => {
            entry["txid"] = json!(txid.as_u64());
            entry["collection"] = json!(collection);
            entry["record"] = record_to_json(record);
        }
        WalRecord::Delete {
            txid,
            collection,
            key,
        } => {
            entry["txid"] = json!(txid.as_u64());
            entry["collection"] = json!(collection);
            entry["key"] = json!(key.to_string());
        }
        WalRecord::Commit { txid, sequence } => {
            entry["txid"] = json!(txid.as_u64());
            entry["sequence"] = json!(sequence.as_u64());
        }
        WalRecord::Checkpoint { sequence } => entry["sequence"] = json!(sequence.as_u64()),
    }
    entry
}
