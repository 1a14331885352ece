//! `pondb checkpoint`

use crate::error::CliResult;
use pondb_core::Database;
use std::path::Path;

pub fn run(path: &Path) -> CliResult<()> {
    let db = Database::open(path)?;
    let before = db.wal_size()?;
    let seq = db.checkpoint()?;
    let after = db.wal_size()?;
    println!("checkpoint at {seq}: WAL {before} -> {after} bytes");
    Ok(())
}
