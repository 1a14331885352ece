//! Records: a primary key plus named field values.

mod key;
mod object;

pub use key::{ObjectId, PrimaryKey};
pub use object::Object;

use crate::error::{CoreError, CoreResult};
use pondb_codec::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored record.
///
/// Identity is the key alone: two records with equal keys are the same
/// record, whatever their fields. Records handed out by the database are
/// snapshots; changing one has no effect until it is written back inside a
/// write transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    key: PrimaryKey,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates a record with no fields.
    pub fn new(key: impl Into<PrimaryKey>) -> Self {
        Self {
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Creates a record with a generated object ID.
    #[must_use]
    pub fn with_generated_key() -> Self {
        Self::new(PrimaryKey::generate())
    }

    /// Creates a record from a key and a field map.
    #[must_use]
    pub fn from_fields(key: PrimaryKey, fields: BTreeMap<String, Value>) -> Self {
        Self { key, fields }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Returns the primary key.
    #[must_use]
    pub fn key(&self) -> &PrimaryKey {
        &self.key
    }

    /// Returns all fields, ordered by name.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Consumes the record, returning its fields.
    #[must_use]
    pub fn into_fields(self) -> BTreeMap<String, Value> {
        self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Resolves a dotted path: the first segment names a field, each further
    /// segment names an entry of the dictionary reached so far.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Returns true if the field is present (even when null).
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Replaces every field with `fields`. The key is kept.
    pub fn replace_fields(&mut self, fields: BTreeMap<String, Value>) {
        self.fields = fields;
    }

    /// Returns a field, failing when it is absent.
    pub fn require(&self, field: &str) -> CoreResult<&Value> {
        self.fields.get(field).ok_or_else(|| CoreError::FieldType {
            field: field.to_string(),
            expected: "a value",
            found: "missing",
        })
    }

    /// Returns a text field.
    pub fn require_text(&self, field: &str) -> CoreResult<&str> {
        let value = self.require(field)?;
        value.as_text().ok_or_else(|| type_error(field, "text", value))
    }

    /// Returns an integer field.
    pub fn require_integer(&self, field: &str) -> CoreResult<i64> {
        let value = self.require(field)?;
        value
            .as_integer()
            .ok_or_else(|| type_error(field, "integer", value))
    }

    /// Returns a dictionary field.
    pub fn require_dictionary(&self, field: &str) -> CoreResult<&BTreeMap<String, Value>> {
        let value = self.require(field)?;
        value
            .as_dictionary()
            .ok_or_else(|| type_error(field, "dictionary", value))
    }

    /// Returns true if `field` is a dictionary holding `key`.
    #[must_use]
    pub fn dictionary_contains_key(&self, field: &str, key: &str) -> bool {
        self.fields
            .get(field)
            .and_then(Value::as_dictionary)
            .is_some_and(|d| d.contains_key(key))
    }

    /// Overwrites the entry `key` of dictionary `field` only if it already
    /// exists.
    ///
    /// Returns whether the entry existed (and was updated). A missing field
    /// counts as an empty dictionary. Fails if the field holds a
    /// non-dictionary value.
    pub fn dictionary_set_existing(
        &mut self,
        field: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> CoreResult<bool> {
        let Some(current) = self.fields.get_mut(field) else {
            return Ok(false);
        };
        let found = current.type_name();
        let dict = current
            .as_dictionary_mut()
            .ok_or_else(|| field_type(field, "dictionary", found))?;
        match dict.get_mut(key) {
            Some(slot) => {
                *slot = value.into();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Inserts or overwrites the entry `key` of dictionary `field`,
    /// creating the dictionary if the field is absent.
    ///
    /// Returns the previous entry value.
    pub fn dictionary_put(
        &mut self,
        field: &str,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> CoreResult<Option<Value>> {
        let current = self
            .fields
            .entry(field.to_string())
            .or_insert_with(|| Value::Dictionary(BTreeMap::new()));
        let found = current.type_name();
        let dict = current
            .as_dictionary_mut()
            .ok_or_else(|| field_type(field, "dictionary", found))?;
        Ok(dict.insert(key.into(), value.into()))
    }

    /// Removes the entry `key` of dictionary `field`.
    pub fn dictionary_remove(&mut self, field: &str, key: &str) -> CoreResult<Option<Value>> {
        let Some(current) = self.fields.get_mut(field) else {
            return Ok(None);
        };
        let found = current.type_name();
        let dict = current
            .as_dictionary_mut()
            .ok_or_else(|| field_type(field, "dictionary", found))?;
        Ok(dict.remove(key))
    }
}

fn type_error(field: &str, expected: &'static str, value: &Value) -> CoreError {
    field_type(field, expected, value.type_name())
}

fn field_type(field: &str, expected: &'static str, found: &'static str) -> CoreError {
    CoreError::FieldType {
        field: field.to_string(),
        expected,
        found,
    }
}
