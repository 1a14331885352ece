//! Typed objects stored as records.

use super::{PrimaryKey, Record};
use crate::error::CoreResult;

/// A Rust type that is stored as a [`Record`] in a fixed collection.
///
/// Implementors map themselves to and from the dynamic record form. The
/// primary key must be stable for the object's lifetime; upserting an
/// object whose key already exists replaces the stored record.
///
/// # Example
///
/// ```rust
/// use pondb_core::{CoreResult, Object, PrimaryKey, Record};
///
/// struct Frog {
///     name: String,
///     age: i64,
/// }
///
/// impl Object for Frog {
///     const COLLECTION: &'static str = "Frog";
///
///     fn primary_key(&self) -> PrimaryKey {
///         PrimaryKey::from(self.name.as_str())
///     }
///
///     fn to_record(&self) -> Record {
///         Record::new(self.primary_key()).with("age", self.age)
///     }
///
///     fn from_record(record: &Record) -> CoreResult<Self> {
///         let PrimaryKey::Text(name) = record.key() else {
///             return Err(pondb_core::CoreError::invalid_format("frog key must be text"));
///         };
///         Ok(Frog { name: name.clone(), age: record.require_integer("age")? })
///     }
/// }
/// ```
pub trait Object: Sized {
    /// Name of the collection holding objects of this type.
    const COLLECTION: &'static str;

    /// Returns the object's primary key.
    fn primary_key(&self) -> PrimaryKey;

    /// Converts the object to a record. The record's key must equal
    /// [`Object::primary_key`].
    fn to_record(&self) -> Record;

    /// Rebuilds the object from a stored record.
    fn from_record(record: &Record) -> CoreResult<Self>;
}
