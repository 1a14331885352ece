//! `pondb get`

use super::Format;
use crate::error::{CliError, CliResult};
use crate::json::parse_key;
use pondb_core::Database;
use std::path::Path;

pub fn run(path: &Path, collection: &str, key: &str, format: Format) -> CliResult<()> {
    let db = Database::open(path)?;
    let key = parse_key(key)?;
    let record = db
        .find(collection, &key)?
        .ok_or_else(|| CliError::argument(format!("no record {key} in {collection}")))?;
    super::query::print_records(std::slice::from_ref(&record), format)
}
