use crate::document::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// An equality-based filter: field name to expected literal value.
/// An empty query matches every document.
pub type Query = Map<String, Value>;

/// Reserved namespace for future query operators. Fields starting with
/// this prefix are skipped entirely during matching.
pub const RESERVED_PREFIX: char = '$';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sort/skip/limit applied to query results, strictly in that order so
/// pagination is well-defined over a stable ordering.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub sort: Vec<(String, SortOrder)>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sort key. Keys contribute in the order they were added.
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A document matches iff every non-reserved query field is strictly
/// equal to the document's value for that field.
pub fn matches(doc: &Document, query: &Query) -> bool {
    for (field, expected) in query {
        if field.starts_with(RESERVED_PREFIX) {
            continue;
        }
        if doc.get(field) != Some(expected) {
            return false;
        }
    }
    true
}

/// Log once per query for every field in the reserved operator
/// namespace; they are a documented no-op.
pub(crate) fn warn_reserved(collection: &str, query: &Query) {
    for field in query.keys() {
        if field.starts_with(RESERVED_PREFIX) {
            log::warn!(
                "query field '{field}' uses the reserved operator prefix and is ignored (collection '{collection}')"
            );
        }
    }
}

/// Apply sort, then skip, then limit, in place. The sort is stable, so
/// documents equal on all sort keys keep their insertion order.
pub fn apply_options(results: &mut Vec<Document>, options: &QueryOptions) {
    if !options.sort.is_empty() {
        results.sort_by(|a, b| compare_documents(a, b, &options.sort));
    }
    if let Some(skip) = options.skip {
        if skip >= results.len() {
            results.clear();
        } else {
            results.drain(..skip);
        }
    }
    if let Some(limit) = options.limit {
        results.truncate(limit);
    }
}

/// Multi-key comparator: each key contributes in declared order,
/// short-circuiting on the first non-equal key.
fn compare_documents(a: &Document, b: &Document, keys: &[(String, SortOrder)]) -> Ordering {
    for (field, order) in keys {
        let av = a.get(field).unwrap_or(&Value::Null);
        let bv = b.get(field).unwrap_or(&Value::Null);
        let ord = match order {
            SortOrder::Ascending => compare_values(av, bv),
            SortOrder::Descending => compare_values(av, bv).reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Total order over JSON values for sorting: null < bool < number <
/// string < list < object; containers compare equal among themselves.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
