//! Conversion between JSON and record fields.
//!
//! JSON numbers must be integers. UUID values print as strings and bytes
//! print as arrays of integers, so the mapping is lossy on the way out.

use crate::error::{CliError, CliResult};
use pondb_core::{ObjectId, PrimaryKey, Record, Value};
use serde_json::{Map, Number, Value as Json};
use std::collections::BTreeMap;

/// Parses a key argument: `oid:<uuid>`, `text:<anything>`, an integer, or
/// any other text.
pub fn parse_key(text: &str) -> CliResult<PrimaryKey> {
    if let Some(rest) = text.strip_prefix("text:") {
        return Ok(PrimaryKey::Text(rest.to_string()));
    }
    if let Some(rest) = text.strip_prefix("oid:") {
        return ObjectId::parse(rest)
            .map(PrimaryKey::ObjectId)
            .ok_or_else(|| CliError::argument(format!("invalid object id: {rest}")));
    }
    Ok(match text.parse::<i64>() {
        Ok(n) => PrimaryKey::Integer(n),
        Err(_) => PrimaryKey::Text(text.to_string()),
    })
}

/// Parses a value argument as JSON, or as plain text if it is not JSON.
pub fn parse_value(text: &str) -> CliResult<Value> {
    match serde_json::from_str::<Json>(text) {
        Ok(json) => to_value(&json),
        Err(_) => Ok(Value::Text(text.to_string())),
    }
}

/// Converts JSON into a field value.
pub fn to_value(json: &Json) -> CliResult<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Integer(
            n.as_i64()
                .ok_or_else(|| CliError::argument(format!("not an integer: {n}")))?,
        ),
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(to_value).collect::<CliResult<_>>()?),
        Json::Object(map) => Value::Dictionary(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), to_value(v)?)))
                .collect::<CliResult<BTreeMap<_, _>>>()?,
        ),
    })
}

/// Converts a field value into JSON.
pub fn from_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(n) => Json::Number(Number::from(*n)),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
        Value::Uuid(u) => Json::String(u.to_string()),
        Value::List(items) => Json::Array(items.iter().map(from_value).collect()),
        Value::Dictionary(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_value(v)))
                .collect(),
        ),
    }
}

/// Builds a record from a JSON object of fields.
pub fn record_from_json(key: PrimaryKey, fields: &str) -> CliResult<Record> {
    let json: Json = serde_json::from_str(fields)?;
    let Json::Object(map) = json else {
        return Err(CliError::argument("record fields must be a JSON object"));
    };
    let fields = map
        .iter()
        .map(|(k, v)| Ok((k.clone(), to_value(v)?)))
        .collect::<CliResult<BTreeMap<_, _>>>()?;
    Ok(Record::from_fields(key, fields))
}

/// Renders a record as `{"_key": .., ..fields}`.
pub fn record_to_json(record: &Record) -> Json {
    let mut map = Map::new();
    map.insert("_key".to_string(), key_to_json(record.key()));
    for (name, value) in record.fields() {
        map.insert(name.clone(), from_value(value));
    }
    Json::Object(map)
}

fn key_to_json(key: &PrimaryKey) -> Json {
    match key {
        PrimaryKey::ObjectId(id) => Json::String(format!("oid:{id}")),
        PrimaryKey::Text(s) => Json::String(s.clone()),
        PrimaryKey::Integer(n) => Json::Number(Number::from(*n)),
    }
}
