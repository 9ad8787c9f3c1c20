//! Cache invalidation signal and the list cache that listens to it.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tracing::debug;

use crate::dao::{
    record_store::{RecordScope, RecordStore},
    storage::StorageResult,
};

/// Write-only signal telling observers that a record collection changed.
///
/// Invalidating the same collection twice is harmless.
pub trait CacheInvalidator: Send + Sync {
    /// Mark every cached view of `collection` as stale.
    fn invalidate(&self, collection: &str);
}

/// Process-wide broadcast of invalidated collection keys.
pub struct InvalidationBus {
    sender: broadcast::Sender<String>,
}

impl InvalidationBus {
    /// Construct a bus backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent collection keys.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Subscribe as a stream, skipping notifications lost to lagging.
    pub fn stream(&self) -> impl Stream<Item = String> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(|key| key.ok())
    }
}

impl CacheInvalidator for InvalidationBus {
    fn invalidate(&self, collection: &str) {
        let _ = self.sender.send(collection.to_string());
    }
}

/// Cache of collection listings, dropped whenever their collection is invalidated.
///
/// Dependent views read through [`QueryCache::list`], so the next read after a
/// mutation refetches from the store.
///
/// Each collection carries an epoch bumped by every invalidation; a listing
/// fetched across an invalidation is returned to its caller but never cached.
pub struct QueryCache {
    entries: DashMap<(String, RecordScope), Arc<Vec<Value>>>,
    epochs: DashMap<String, u64>,
    bus: InvalidationBus,
}

impl QueryCache {
    /// Create an empty cache whose invalidation bus has the given capacity.
    pub fn new(bus_capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            epochs: DashMap::new(),
            bus: InvalidationBus::new(bus_capacity),
        }
    }

    /// Bus re-broadcasting every invalidation handled by this cache.
    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    /// Cached rows for `collection` within `scope`, if still fresh.
    pub fn cached(&self, collection: &str, scope: &RecordScope) -> Option<Arc<Vec<Value>>> {
        self.entries
            .get(&(collection.to_string(), scope.clone()))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Rows for `collection` within `scope`, fetched from `store` on a miss.
    pub async fn list(
        &self,
        store: &dyn RecordStore,
        collection: &str,
        scope: &RecordScope,
    ) -> StorageResult<Arc<Vec<Value>>> {
        if let Some(rows) = self.cached(collection, scope) {
            return Ok(rows);
        }

        let epoch = self.epoch(collection);
        let rows = Arc::new(store.query(collection, scope).await?);

        let current = self.epochs.get(collection);
        if current.as_deref().copied().unwrap_or_default() == epoch {
            self.entries
                .insert((collection.to_string(), scope.clone()), Arc::clone(&rows));
        } else {
            debug!(%collection, "listing fetched across an invalidation; not cached");
        }
        drop(current);

        Ok(rows)
    }

    fn epoch(&self, collection: &str) -> u64 {
        self.epochs
            .get(collection)
            .map(|epoch| *epoch)
            .unwrap_or_default()
    }
}

impl CacheInvalidator for QueryCache {
    fn invalidate(&self, collection: &str) {
        let mut epoch = self.epochs.entry(collection.to_string()).or_default();
        *epoch += 1;
        self.entries.retain(|(cached, _), _| cached != collection);
        drop(epoch);
        debug!(%collection, "collection invalidated");
        self.bus.invalidate(collection);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{dao::record_store::MemoryRecordStore, test_support::ScriptedStore};

    #[tokio::test]
    async fn list_is_served_from_cache_until_invalidated() {
        let store = MemoryRecordStore::new();
        store.insert("players", json!({ "id": "p1" })).unwrap();
        let cache = QueryCache::new(4);
        let scope = RecordScope::new();

        assert_eq!(cache.list(&store, "players", &scope).await.unwrap().len(), 1);

        store.insert("players", json!({ "id": "p2" })).unwrap();
        assert_eq!(cache.list(&store, "players", &scope).await.unwrap().len(), 1);

        cache.invalidate("players");
        assert!(cache.cached("players", &scope).is_none());
        assert_eq!(cache.list(&store, "players", &scope).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn listing_in_flight_during_invalidation_is_not_cached() {
        let store = ScriptedStore::default();
        let gate = store.gate_query();
        let cache = QueryCache::new(4);
        let scope = RecordScope::new();

        let pending = cache.list(&store, "players", &scope);
        tokio::pin!(pending);
        assert!(futures::poll!(&mut pending).is_pending());

        store.memory.insert("players", json!({ "id": "p1" })).unwrap();
        cache.invalidate("players");
        gate.send(Ok(Vec::new())).unwrap();

        assert!(pending.await.unwrap().is_empty());
        assert!(cache.cached("players", &scope).is_none());
        assert_eq!(cache.list(&store, "players", &scope).await.unwrap().len(), 1);
        assert!(cache.cached("players", &scope).is_some());
    }

    #[tokio::test]
    async fn invalidation_only_drops_the_named_collection() {
        let store = MemoryRecordStore::new();
        let cache = QueryCache::new(4);
        let scope = RecordScope::new();
        cache.list(&store, "players", &scope).await.unwrap();
        cache.list(&store, "maps", &scope).await.unwrap();

        cache.invalidate("players");

        assert!(cache.cached("players", &scope).is_none());
        assert!(cache.cached("maps", &scope).is_some());
    }

    #[tokio::test]
    async fn invalidations_are_rebroadcast() {
        let cache = QueryCache::new(4);
        let mut rx = cache.bus().subscribe();

        cache.invalidate("players");
        cache.invalidate("players");

        assert_eq!(rx.recv().await.unwrap(), "players");
        assert_eq!(rx.recv().await.unwrap(), "players");
    }

    #[tokio::test]
    async fn bus_stream_yields_collection_keys() {
        let bus = InvalidationBus::new(4);
        let stream = bus.stream();
        tokio::pin!(stream);

        bus.invalidate("maps");

        assert_eq!(stream.next().await.as_deref(), Some("maps"));
    }
}
