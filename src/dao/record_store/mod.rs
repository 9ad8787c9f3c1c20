pub mod memory;
#[cfg(feature = "rest-store")]
pub mod rest;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::dao::storage::StorageResult;

pub use self::memory::MemoryRecordStore;

/// Equality filters narrowing a fetch or a query to the caller's scope
/// (owning user, sweepstake, map...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordScope {
    filters: Vec<(String, String)>,
}

impl RecordScope {
    /// Scope matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter on `field`.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Add an equality filter only when a value is present.
    pub fn with_optional(self, field: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with(field, value),
            None => self,
        }
    }

    /// Filters in insertion order.
    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Whether `record` satisfies every filter of this scope.
    pub fn matches(&self, record: &Value) -> bool {
        self.filters.iter().all(|(field, expected)| {
            record
                .get(field)
                .is_some_and(|value| value_matches(value, expected))
        })
    }
}

/// Compare a JSON scalar with the string form used by equality filters.
pub(crate) fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(text) => text == expected,
        Value::Number(number) => number.to_string() == expected,
        Value::Bool(flag) => flag.to_string() == expected,
        _ => false,
    }
}

/// String form of a record identifier, accepting string or numeric ids.
pub(crate) fn record_id(fields: &Map<String, Value>) -> Option<String> {
    match fields.get("id")? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Abstraction over the remote record service backing every dialog.
///
/// Records are plain JSON objects; each dialog decodes them into its own
/// entity type. Futures are `'static` so callers can dispatch them onto the
/// runtime without borrowing the store.
pub trait RecordStore: Send + Sync {
    /// Load the record `id` from `collection`, restricted to `scope`.
    fn fetch(
        &self,
        collection: &str,
        id: &str,
        scope: &RecordScope,
    ) -> BoxFuture<'static, StorageResult<Option<Value>>>;
    /// Insert `record`, or merge it into the existing record with the same id.
    fn upsert(&self, collection: &str, record: Value) -> BoxFuture<'static, StorageResult<()>>;
    /// List every record of `collection` matching `scope`.
    fn query(
        &self,
        collection: &str,
        scope: &RecordScope,
    ) -> BoxFuture<'static, StorageResult<Vec<Value>>>;
}
