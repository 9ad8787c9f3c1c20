//! In-process record store used by tests and by hosts without a remote backend.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    record_store::{RecordScope, RecordStore, record_id},
    storage::{StorageError, StorageResult},
};

/// Record store keeping every collection in memory, in insertion order.
///
/// Upserts merge the incoming fields into an existing record with the same id,
/// the way the hosted backend resolves duplicates. Records without an id get a
/// fresh UUID.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    collections: Arc<DashMap<String, IndexMap<String, Value>>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge `record` synchronously, returning the id it was stored under.
    pub fn insert(&self, collection: &str, record: Value) -> StorageResult<String> {
        let Value::Object(mut fields) = record else {
            return Err(StorageError::constraint(format!(
                "records in `{collection}` must be JSON objects"
            )));
        };

        let id = match record_id(&fields) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                fields.insert("id".into(), Value::String(id.clone()));
                id
            }
        };

        let mut records = self.collections.entry(collection.to_string()).or_default();
        if let Some(Value::Object(existing)) = records.get_mut(&id) {
            existing.extend(fields);
        } else {
            records.insert(id.clone(), Value::Object(fields));
        }

        Ok(id)
    }

    /// Look a record up without any scope filtering.
    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .get(collection)
            .and_then(|records| records.get(id).cloned())
    }

    /// Number of records stored in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|records| records.len())
            .unwrap_or(0)
    }

    /// Whether `collection` holds no record.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl RecordStore for MemoryRecordStore {
    fn fetch(
        &self,
        collection: &str,
        id: &str,
        scope: &RecordScope,
    ) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let found = self
            .get(collection, id)
            .filter(|record| scope.matches(record));
        Box::pin(async move { Ok(found) })
    }

    fn upsert(&self, collection: &str, record: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let collection = collection.to_string();
        Box::pin(async move {
            let id = store.insert(&collection, record)?;
            debug!(%collection, %id, "record upserted");
            Ok(())
        })
    }

    fn query(
        &self,
        collection: &str,
        scope: &RecordScope,
    ) -> BoxFuture<'static, StorageResult<Vec<Value>>> {
        let rows = self
            .collections
            .get(collection)
            .map(|records| {
                records
                    .values()
                    .filter(|record| scope.matches(record))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Box::pin(async move { Ok(rows) })
    }
}
