//! Upsert by primary key.

use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::transaction::WriteTransaction;

/// What to do when the candidate's key is already taken (or not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Insert if absent, otherwise replace every field of the existing
    /// record with the candidate's. Fields the candidate lacks are dropped.
    #[default]
    ReplaceAll,
    /// Insert if absent, otherwise fail with [`CoreError::Conflict`].
    FailOnConflict,
    /// Insert if absent, otherwise fail with [`CoreError::DuplicateKey`].
    InsertOnly,
    /// Replace if present, otherwise fail with [`CoreError::NotFound`].
    ReplaceOnly,
}

impl UpdatePolicy {
    /// Parses the lowercase names used on the command line.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "replace-all" | "all" => Some(Self::ReplaceAll),
            "fail-on-conflict" | "error" => Some(Self::FailOnConflict),
            "insert-only" | "insert" => Some(Self::InsertOnly),
            "replace-only" | "replace" => Some(Self::ReplaceOnly),
            _ => None,
        }
    }
}

/// Stages `candidate` in `txn` according to `policy`.
///
/// The lookup sees the transaction's own earlier writes. On error nothing is
/// staged. Returns the record as it will read after commit.
pub(crate) fn resolve(
    txn: &mut WriteTransaction<'_>,
    collection: &str,
    candidate: Record,
    policy: UpdatePolicy,
) -> CoreResult<Record> {
    let exists = txn.contains(collection, candidate.key())?;

    match (exists, policy) {
        (false, UpdatePolicy::ReplaceOnly) => {
            return Err(CoreError::not_found(collection, candidate.key().clone()))
        }
        (true, UpdatePolicy::FailOnConflict) => {
            return Err(CoreError::conflict(collection, candidate.key().clone()))
        }
        (true, UpdatePolicy::InsertOnly) => {
            return Err(CoreError::duplicate_key(collection, candidate.key().clone()))
        }
        _ => {}
    }

    tracing::debug!(
        collection,
        key = %candidate.key(),
        replaced = exists,
        ?policy,
        "upsert staged"
    );
    txn.put(collection, candidate.clone())?;
    Ok(candidate)
}
