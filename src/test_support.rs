//! Fakes shared by the controller tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::{
    sync::{oneshot, watch},
    time::timeout,
};

use crate::{
    cache::CacheInvalidator,
    dao::{
        record_store::{MemoryRecordStore, RecordScope, RecordStore},
        storage::{StorageError, StorageResult},
    },
    modal::ModalContext,
    notify::{Notification, NotificationKind, Notifier},
    validation::ValidationTrigger,
};

type FetchReply = StorageResult<Option<Value>>;
type QueryReply = StorageResult<Vec<Value>>;

/// Notifier keeping every notification for later assertions.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn entries(&self) -> Vec<Notification> {
        self.entries.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, kind: NotificationKind) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, subject: &str, detail: &str) {
        self.entries.lock().unwrap().push(Notification {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        });
    }
}

/// Invalidator recording every collection key it receives.
#[derive(Default)]
pub(crate) struct RecordingInvalidator {
    keys: Mutex<Vec<String>>,
}

impl RecordingInvalidator {
    pub(crate) fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn invalidate(&self, collection: &str) {
        self.keys.lock().unwrap().push(collection.into());
    }
}

/// Store backed by [`MemoryRecordStore`] whose calls can be held, failed and inspected.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    pub(crate) memory: MemoryRecordStore,
    fetch_gates: Mutex<HashMap<String, oneshot::Receiver<FetchReply>>>,
    query_gates: Mutex<VecDeque<oneshot::Receiver<QueryReply>>>,
    upsert_failures: Mutex<VecDeque<StorageError>>,
    upsert_hold: Mutex<Option<oneshot::Receiver<()>>>,
    fetches: Mutex<Vec<String>>,
    queries: Mutex<Vec<RecordScope>>,
    upserts: Mutex<Vec<(String, Value)>>,
}

impl ScriptedStore {
    /// Hold the next fetch of `id` until the returned sender answers it.
    pub(crate) fn gate_fetch(&self, id: &str) -> oneshot::Sender<FetchReply> {
        let (tx, rx) = oneshot::channel();
        self.fetch_gates.lock().unwrap().insert(id.into(), rx);
        tx
    }

    /// Hold the next unanswered query until the returned sender answers it.
    pub(crate) fn gate_query(&self) -> oneshot::Sender<QueryReply> {
        let (tx, rx) = oneshot::channel();
        self.query_gates.lock().unwrap().push_back(rx);
        tx
    }

    /// Make the next upsert fail with `err`.
    pub(crate) fn fail_next_upsert(&self, err: StorageError) {
        self.upsert_failures.lock().unwrap().push_back(err);
    }

    /// Keep the next upsert in flight until the returned sender fires.
    pub(crate) fn hold_next_upsert(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.upsert_hold.lock().unwrap() = Some(rx);
        tx
    }

    pub(crate) fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub(crate) fn queries(&self) -> Vec<RecordScope> {
        self.queries.lock().unwrap().clone()
    }

    pub(crate) fn upserts(&self) -> Vec<(String, Value)> {
        self.upserts.lock().unwrap().clone()
    }
}

impl RecordStore for ScriptedStore {
    fn fetch(
        &self,
        collection: &str,
        id: &str,
        scope: &RecordScope,
    ) -> BoxFuture<'static, FetchReply> {
        self.fetches.lock().unwrap().push(id.into());
        match self.fetch_gates.lock().unwrap().remove(id) {
            Some(gate) => Box::pin(async move {
                gate.await
                    .unwrap_or_else(|_| Err(StorageError::constraint("fetch gate dropped")))
            }),
            None => self.memory.fetch(collection, id, scope),
        }
    }

    fn upsert(&self, collection: &str, record: Value) -> BoxFuture<'static, StorageResult<()>> {
        self.upserts
            .lock()
            .unwrap()
            .push((collection.into(), record.clone()));
        let hold = self.upsert_hold.lock().unwrap().take();
        let failure = self.upsert_failures.lock().unwrap().pop_front();
        let memory = self.memory.clone();
        let collection = collection.to_string();
        Box::pin(async move {
            if let Some(hold) = hold {
                let _ = hold.await;
            }
            match failure {
                Some(err) => Err(err),
                None => memory.upsert(&collection, record).await,
            }
        })
    }

    fn query(&self, collection: &str, scope: &RecordScope) -> BoxFuture<'static, QueryReply> {
        self.queries.lock().unwrap().push(scope.clone());
        match self.query_gates.lock().unwrap().pop_front() {
            Some(gate) => Box::pin(async move {
                gate.await
                    .unwrap_or_else(|_| Err(StorageError::constraint("query gate dropped")))
            }),
            None => self.memory.query(collection, scope),
        }
    }
}

/// Bundle of fakes wired into a [`ModalContext`].
#[derive(Default)]
pub(crate) struct Harness {
    pub(crate) store: Arc<ScriptedStore>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) invalidator: Arc<RecordingInvalidator>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn context(&self) -> ModalContext {
        self.context_with(ValidationTrigger::OnSubmit)
    }

    pub(crate) fn context_with(&self, validation_trigger: ValidationTrigger) -> ModalContext {
        ModalContext {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            invalidator: self.invalidator.clone(),
            validation_trigger,
        }
    }
}

/// Wait until the watched value satisfies `predicate`.
pub(crate) async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, predicate: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("controller dropped")
        .clone()
}

/// Let spawned tasks run to completion on the current-thread runtime.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
