//! `pondb upsert`

use crate::error::{CliError, CliResult};
use crate::json::{parse_key, record_from_json, record_to_json};
use pondb_core::{Database, PrimaryKey, UpdatePolicy};
use std::path::Path;

pub fn run(
    path: &Path,
    collection: &str,
    key: Option<&str>,
    fields: &str,
    policy: &str,
) -> CliResult<()> {
    let policy = UpdatePolicy::from_name(policy)
        .ok_or_else(|| CliError::argument(format!("unknown policy: {policy}")))?;
    let key = match key {
        Some(text) => parse_key(text)?,
        None => PrimaryKey::generate(),
    };
    let record = record_from_json(key, fields)?;

    let db = Database::open(path)?;
    let stored = db.upsert(collection, record, policy)?;
    tracing::info!(collection, key = %stored.key(), ?policy, "upserted");
    println!("{}", record_to_json(&stored));
    Ok(())
}
