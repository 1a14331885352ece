//! `pondb inspect`

use super::Format;
use crate::error::CliResult;
use pondb_core::{Database, Query};
use serde_json::json;
use std::path::Path;

pub fn run(path: &Path, show_collections: bool, format: Format) -> CliResult<()> {
    let db = Database::open(path)?;
    let mut collections = Vec::new();
    if show_collections {
        for name in db.collections()? {
            let count = db.count(&Query::new(name.as_str()))?;
            collections.push((name, count));
        }
    }

    match format {
        Format::Json => {
            let report = json!({
                "path": path.display().to_string(),
                "committed_seq": db.committed_seq().as_u64(),
                "wal_bytes": db.wal_size()?,
                "versions": db.transaction_manager().version_count(),
                "collections": collections
                    .iter()
                    .map(|(name, count)| json!({ "name": name, "records": count }))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Format::Text => {
            println!("Database:      {}", path.display());
            println!("Committed seq: {}", db.committed_seq());
            println!("WAL size:      {} bytes", db.wal_size()?);
            println!("Versions:      {}", db.transaction_manager().version_count());
            if show_collections {
                println!();
                println!("Collections:");
                for (name, count) in &collections {
                    println!("  {name:<24} {count} records");
                }
            }
        }
    }
    Ok(())
}
