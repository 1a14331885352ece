//! `pondb delete`

use crate::error::CliResult;
use crate::json::parse_key;
use pondb_core::Database;
use std::path::Path;

pub fn run(path: &Path, collection: &str, key: &str) -> CliResult<()> {
    let db = Database::open(path)?;
    let key = parse_key(key)?;
    if db.delete(collection, &key)? {
        println!("deleted {key} from {collection}");
    } else {
        println!("no record {key} in {collection}");
    }
    Ok(())
}
