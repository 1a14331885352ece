//! Typed record filters.
//!
//! Filters are plain values built with constructor functions and evaluated
//! against records with [`Filter::matches`]. There is no query language.
//!
//! ```rust
//! use pondb_core::{Cmp, Filter, Query};
//!
//! // frogs with more than one favourite pond
//! let q = Query::new("Frog").filter(Filter::count("favoritePondsByForest", Cmp::Gt, 1));
//! # let _ = q;
//! ```

use crate::record::{PrimaryKey, Record};
use pondb_codec::Value;
use std::cmp::Ordering;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl Cmp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

/// A predicate over records.
///
/// Field paths use `.` to step into dictionary entries: `"ponds.Lothlorien"`
/// is the `Lothlorien` entry of the `ponds` dictionary. A missing field
/// reads as [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every record.
    All,
    /// Matches the record with this key.
    Key(PrimaryKey),
    /// Compares the value at a path with a constant.
    ///
    /// `Eq` and `Ne` compare any two values; ordering operators only match
    /// values of the same scalar kind.
    Compare {
        /// Field path.
        path: String,
        /// Operator.
        cmp: Cmp,
        /// Right-hand side.
        value: Value,
    },
    /// Compares the element count of a list or dictionary. Missing fields
    /// count as empty; scalars never match.
    Count {
        /// Field path.
        path: String,
        /// Operator.
        cmp: Cmp,
        /// Right-hand side.
        count: usize,
    },
    /// The dictionary at `path` has an entry named `key`.
    ContainsKey {
        /// Field path.
        path: String,
        /// Entry name.
        key: String,
    },
    /// The list or dictionary at `path` holds `value` as an element.
    ContainsValue {
        /// Field path.
        path: String,
        /// Element to look for.
        value: Value,
    },
    /// Every sub-filter matches (true when empty).
    And(Vec<Filter>),
    /// At least one sub-filter matches (false when empty).
    Or(Vec<Filter>),
    /// Negation.
    Not(Box<Filter>),
}

impl Filter {
    fn compare(path: impl Into<String>, cmp: Cmp, value: impl Into<Value>) -> Self {
        Self::Compare {
            path: path.into(),
            cmp,
            value: value.into(),
        }
    }

    /// `path == value`
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Cmp::Eq, value)
    }

    /// `path != value`
    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Cmp::Ne, value)
    }

    /// `path > value`
    pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Cmp::Gt, value)
    }

    /// `path >= value`
    pub fn ge(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Cmp::Ge, value)
    }

    /// `path < value`
    pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Cmp::Lt, value)
    }

    /// `path <= value`
    pub fn le(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Cmp::Le, value)
    }

    /// Element count of the collection at `path`.
    pub fn count(path: impl Into<String>, cmp: Cmp, count: usize) -> Self {
        Self::Count {
            path: path.into(),
            cmp,
            count,
        }
    }

    /// Dictionary at `path` has entry `key`.
    pub fn contains_key(path: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ContainsKey {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Collection at `path` holds `value`.
    pub fn contains_value(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ContainsValue {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Matches the record with `key`.
    pub fn key(key: impl Into<PrimaryKey>) -> Self {
        Self::Key(key.into())
    }

    /// Conjunction with another filter.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Disjunction with another filter.
    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Negation.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluates the filter against `record`.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Key(key) => record.key() == key,
            Self::Compare { path, cmp, value } => {
                let field = record.get_path(path).unwrap_or(&Value::Null);
                match cmp {
                    Cmp::Eq => field == value,
                    Cmp::Ne => field != value,
                    _ => field.compare(value).is_some_and(|o| cmp.holds(o)),
                }
            }
            Self::Count { path, cmp, count } => {
                let len = match record.get_path(path) {
                    None => Some(0),
                    Some(value) => value.element_count(),
                };
                len.is_some_and(|len| cmp.holds(len.cmp(count)))
            }
            Self::ContainsKey { path, key } => record
                .get_path(path)
                .and_then(Value::as_dictionary)
                .is_some_and(|d| d.contains_key(key)),
            Self::ContainsValue { path, value } => match record.get_path(path) {
                Some(Value::List(items)) => items.contains(value),
                Some(Value::Dictionary(map)) => map.values().any(|v| v == value),
                _ => false,
            },
            Self::And(filters) => filters.iter().all(|f| f.matches(record)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(record)),
            Self::Not(inner) => !inner.matches(record),
        }
    }
}

/// A filter bound to a collection, with an optional result limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filter: Filter,
    limit: Option<usize>,
}

impl Query {
    /// Matches every record of `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: Filter::All,
            limit: None,
        }
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Collection the query reads.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The filter.
    #[must_use]
    pub fn predicate(&self) -> &Filter {
        &self.filter
    }

    /// Keeps the records that match, in input order, up to the limit.
    pub(crate) fn select(&self, records: impl IntoIterator<Item = Record>) -> Vec<Record> {
        let matching = records.into_iter().filter(|r| self.filter.matches(r));
        match self.limit {
            Some(n) => matching.take(n).collect(),
            None => matching.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wirt() -> Record {
        Record::new("X")
            .with("name", "Wirt")
            .with("age", 4)
            .with("tags", Value::list(["green", "small"]))
            .with(
                "favoritePondsByForest",
                Value::dictionary([
                    ("Hundred Acre Wood", "Lily Pad Pond"),
                    ("Sherwood Forest", "Miller Pond"),
                ]),
            )
    }

    #[test]
    fn comparisons() {
        let r = wirt();
        assert!(Filter::eq("name", "Wirt").matches(&r));
        assert!(Filter::ne("name", "Jim").matches(&r));
        assert!(Filter::gt("age", 3).matches(&r));
        assert!(Filter::ge("age", 4).matches(&r));
        assert!(!Filter::lt("age", 4).matches(&r));
        assert!(Filter::le("age", 4).matches(&r));
    }

    #[test]
    fn ordering_across_kinds_never_matches() {
        let r = wirt();
        assert!(!Filter::gt("age", "3").matches(&r));
        assert!(!Filter::lt("age", "3").matches(&r));
        assert!(Filter::ne("age", "4").matches(&r));
    }

    #[test]
    fn missing_field_is_null() {
        let r = wirt();
        assert!(Filter::eq("owner", Value::Null).matches(&r));
        assert!(Filter::ne("owner", "Jim").matches(&r));
        assert!(!Filter::gt("owner", 0).matches(&r));
    }

    #[test]
    fn dictionary_paths() {
        let r = wirt();
        assert!(Filter::eq("favoritePondsByForest.Sherwood Forest", "Miller Pond").matches(&r));
        assert!(Filter::contains_key("favoritePondsByForest", "Hundred Acre Wood").matches(&r));
        assert!(!Filter::contains_key("favoritePondsByForest", "Lothlorien").matches(&r));
        assert!(Filter::contains_value("favoritePondsByForest", "Lily Pad Pond").matches(&r));
    }

    #[test]
    fn counts() {
        let r = wirt();
        assert!(Filter::count("favoritePondsByForest", Cmp::Gt, 1).matches(&r));
        assert!(Filter::count("tags", Cmp::Eq, 2).matches(&r));
        assert!(Filter::count("missing", Cmp::Eq, 0).matches(&r));
        assert!(!Filter::count("name", Cmp::Ge, 0).matches(&r));
    }

    #[test]
    fn list_membership() {
        let r = wirt();
        assert!(Filter::contains_value("tags", "green").matches(&r));
        assert!(!Filter::contains_value("tags", "brown").matches(&r));
        assert!(!Filter::contains_value("name", "Wirt").matches(&r));
    }

    #[test]
    fn combinators() {
        let r = wirt();
        let f = Filter::eq("name", "Wirt").and(Filter::gt("age", 10));
        assert!(!f.matches(&r));
        let f = Filter::eq("name", "Jim").or(Filter::key("X"));
        assert!(f.matches(&r));
        assert!(Filter::eq("name", "Jim").negate().matches(&r));
        assert!(Filter::And(vec![]).matches(&r));
        assert!(!Filter::Or(vec![]).matches(&r));
    }

    #[test]
    fn and_flattens() {
        let f = Filter::All.and(Filter::All).and(Filter::All);
        assert!(matches!(f, Filter::And(ref v) if v.len() == 3));
    }

    #[test]
    fn select_applies_limit() {
        let records = (1..=5).map(|n| Record::new(n).with("n", n));
        let q = Query::new("N").filter(Filter::gt("n", 1)).limit(2);
        let selected = q.select(records);
        let keys: Vec<_> = selected.iter().map(|r| r.key().clone()).collect();
        assert_eq!(keys, vec![PrimaryKey::from(2), PrimaryKey::from(3)]);
    }
}
