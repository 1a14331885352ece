//! `pondb query`
//!
//! Conditions are written `path OP value`, with OP one of `==`, `!=`,
//! `>=`, `<=`, `>`, `<`. Sizes use `--count path OP n`. All given
//! conditions must hold.

use super::Format;
use crate::error::{CliError, CliResult};
use crate::json::{parse_value, record_to_json};
use pondb_core::{Cmp, Database, Filter, Query, Record};
use std::path::Path;

/// Filter arguments collected from the command line.
#[derive(Debug, Default)]
pub struct Conditions {
    pub filters: Vec<String>,
    pub counts: Vec<String>,
    pub contains_keys: Vec<String>,
}

pub fn run(
    path: &Path,
    collection: &str,
    conditions: &Conditions,
    limit: Option<usize>,
    delete: bool,
    format: Format,
) -> CliResult<()> {
    let mut query = Query::new(collection).filter(build_filter(conditions)?);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    let db = Database::open(path)?;
    if delete {
        let removed = db.delete_where(&query)?;
        println!("deleted {removed} records from {collection}");
        return Ok(());
    }
    print_records(&db.query(&query)?, format)
}

pub fn print_records(records: &[Record], format: Format) -> CliResult<()> {
    match format {
        Format::Json => {
            let items: Vec<_> = records.iter().map(record_to_json).collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Format::Text => {
            for record in records {
                let fields = record
                    .fields()
                    .iter()
                    .map(|(name, value)| format!("{name}={}", crate::json::from_value(value)))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{}  {fields}", record.key());
            }
        }
    }
    Ok(())
}

pub fn build_filter(conditions: &Conditions) -> CliResult<Filter> {
    let mut filters = Vec::new();
    for text in &conditions.filters {
        let (path, cmp, value) = split_condition(text)?;
        let value = parse_value(value)?;
        filters.push(Filter::Compare {
            path: path.to_string(),
            cmp,
            value,
        });
    }
    for text in &conditions.counts {
        let (path, cmp, count) = split_condition(text)?;
        let count = count
            .parse::<usize>()
            .map_err(|_| CliError::argument(format!("count must be a number: {text}")))?;
        filters.push(Filter::count(path, cmp, count));
    }
    for text in &conditions.contains_keys {
        let (path, key) = text
            .split_once(':')
            .ok_or_else(|| CliError::argument(format!("expected path:key, got {text}")))?;
        filters.push(Filter::contains_key(path.trim(), key.trim()));
    }
    Ok(match filters.len() {
        0 => Filter::All,
        1 => filters.remove(0),
        _ => Filter::And(filters),
    })
}

const OPERATORS: [(&str, Cmp); 6] = [
    ("==", Cmp::Eq),
    ("!=", Cmp::Ne),
    (">=", Cmp::Ge),
    ("<=", Cmp::Le),
    (">", Cmp::Gt),
    ("<", Cmp::Lt),
];

fn split_condition(text: &str) -> CliResult<(&str, Cmp, &str)> {
    let found = OPERATORS
        .iter()
        .filter_map(|(op, cmp)| text.find(op).map(|at| (at, *op, *cmp)))
        .min_by_key(|(at, op, _)| (*at, usize::MAX - op.len()));
    let (at, op, cmp) =
        found.ok_or_else(|| CliError::argument(format!("no operator in condition: {text}")))?;
    let path = text[..at].trim();
    let value = text[at + op.len()..].trim();
    if path.is_empty() {
        return Err(CliError::argument(format!("missing field in condition: {text}")));
    }
    Ok((path, cmp, value))
}
