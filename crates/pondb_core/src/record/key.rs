//! Record identifiers.

use pondb_codec::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generated 128-bit object identifier.
///
/// Object IDs are random (UUID v4), immutable once assigned and never reused
/// by the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Creates a new random object ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates an object ID from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses the hyphenated textual form.
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(Self)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The primary key of a record.
///
/// Keys are opaque to the store: they are only compared for equality and
/// ordered so iteration is deterministic. Keys of different kinds never
/// compare equal (`Text("1")` and `Integer(1)` are distinct records).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimaryKey {
    /// Generated object ID.
    ObjectId(ObjectId),
    /// Caller-chosen string key.
    Text(String),
    /// Caller-chosen integer key.
    Integer(i64),
}

impl PrimaryKey {
    /// A key holding a freshly generated object ID.
    #[must_use]
    pub fn generate() -> Self {
        Self::ObjectId(ObjectId::new())
    }

    /// Converts the key to a field value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::ObjectId(id) => Value::Uuid(id.as_uuid()),
            Self::Text(s) => Value::Text(s.clone()),
            Self::Integer(n) => Value::Integer(*n),
        }
    }

    /// Converts a field value back to a key.
    ///
    /// Only UUID, text and integer values can act as keys.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uuid(u) => Some(Self::ObjectId(ObjectId::from_uuid(*u))),
            Value::Text(s) => Some(Self::Text(s.clone())),
            Value::Integer(n) => Some(Self::Integer(*n)),
            _ => None,
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectId(id) => write!(f, "oid:{id}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Integer(n) => write!(f, "{n}"),
        }
    }
}

impl From<ObjectId> for PrimaryKey {
    fn from(id: ObjectId) -> Self {
        Self::ObjectId(id)
    }
}

impl From<&str> for PrimaryKey {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PrimaryKey {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for PrimaryKey {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for PrimaryKey {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}
