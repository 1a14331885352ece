//! # pondb codec
//!
//! The field [`Value`] model used by pondb records, plus CBOR helpers that
//! turn any `serde` type into bytes and back.
//!
//! Encoding is deterministic for [`Value`]: dictionaries are `BTreeMap`s, so
//! equal values always produce equal bytes regardless of insertion order.
//! Floats are not part of the model.
//!
//! ```
//! use pondb_codec::{from_cbor, to_cbor, Value};
//!
//! let value = Value::dictionary([("Lothlorien", Value::from("Linya"))]);
//! let bytes = to_cbor(&value).unwrap();
//! let decoded: Value = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod value;

pub use cbor::{from_cbor, to_cbor};
pub use error::{CodecError, CodecResult};
pub use value::Value;
