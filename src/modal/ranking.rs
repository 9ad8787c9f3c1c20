//! Read-only ranking dialog for one sweepstake map.
//!
//! Opening the dialog immediately queries the ranking lines of the map and
//! shows them once loaded. There is no form and no submit; the only action is
//! importing a leaderboard through a child dialog, reserved to the owner of
//! the sweepstake.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    dao::{
        models::{RankingEntity, SweepstakeMapEntity},
        record_store::{RecordScope, RecordStore},
    },
    dto::ranking::RankingRow,
    error::ModalError,
    notify::{NotificationKind, Notifier},
};

use super::{
    ModalHandle, Seed, dispatch,
    state_machine::{ModalEvent, ModalPhase, ModalStateMachine, RequestToken},
};

const SUBJECT: &str = "Ranking";
const MAP_NOT_PROVIDED: &str = "map not provided";

/// Signed-in organizer looking at the dialog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Viewer {
    /// User id, compared with the sweepstake map owner.
    pub id: String,
}

/// Input to [`RankingModalController::open`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingSeed {
    /// Sweepstake map whose ranking is shown.
    pub sweepstake_map: Option<SweepstakeMapEntity>,
    /// Signed-in user, if any.
    pub viewer: Option<Viewer>,
}

/// Scope of a ranking line: the organizer plus the sweepstake map it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingScope {
    /// Organizer owning the line.
    pub user_id: Option<String>,
    /// Sweepstake the map belongs to.
    pub sweepstake_id: String,
    /// Map the line scores.
    pub map_id: String,
}

/// Observable state of the ranking dialog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingSnapshot {
    /// Lifecycle phase.
    pub phase: ModalPhase,
    /// Seed of the current session, `None` while closed.
    pub seed: Option<RankingSeed>,
    /// Ranking lines; empty while loading.
    pub rows: Vec<RankingRow>,
    /// Session counter, bumped by every open and close.
    pub generation: u64,
}

impl RankingSnapshot {
    /// Whether the dialog is shown.
    pub fn is_visible(&self) -> bool {
        self.phase.is_visible()
    }
}

#[derive(Default)]
struct Session {
    machine: ModalStateMachine,
    seed: Option<RankingSeed>,
    rows: Vec<RankingRow>,
}

impl Session {
    fn snapshot(&self) -> RankingSnapshot {
        RankingSnapshot {
            phase: self.machine.phase(),
            seed: self.seed.clone(),
            rows: self.rows.clone(),
            generation: self.machine.token().generation(),
        }
    }
}

struct Inner {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    collection: String,
    import: Option<Arc<dyn ModalHandle<Seed<RankingScope>>>>,
    session: Mutex<Session>,
    updates: watch::Sender<RankingSnapshot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &Session) {
        self.updates.send_replace(session.snapshot());
    }

    fn apply(&self, session: &mut Session, event: ModalEvent) -> bool {
        match session.machine.apply(event) {
            Ok(_) => true,
            Err(err) => {
                debug!(collection = %self.collection, error = %err, "transition ignored");
                false
            }
        }
    }

    fn finish_load(&self, token: RequestToken, result: Result<Vec<Value>, ModalError>) {
        let mut session = self.lock();
        if !session.machine.accepts(token, ModalPhase::Loading) {
            debug!(
                collection = %self.collection,
                generation = token.generation(),
                "dropping stale ranking result"
            );
            return;
        }

        let rows = result.and_then(|rows| {
            rows.into_iter()
                .map(|row| {
                    serde_json::from_value::<RankingEntity>(row)
                        .map(RankingRow::from)
                        .map_err(ModalError::Decode)
                })
                .collect::<Result<Vec<_>, _>>()
        });

        match rows {
            Ok(rows) => {
                debug!(collection = %self.collection, count = rows.len(), "ranking loaded");
                session.rows = rows;
                self.apply(&mut session, ModalEvent::LoadResolved);
                self.publish(&session);
            }
            Err(err) => {
                self.apply(&mut session, ModalEvent::LoadFailed);
                session.seed = None;
                self.publish(&session);
                drop(session);

                warn!(collection = %self.collection, error = %err, "failed to load ranking; closing dialog");
                self.notifier
                    .notify(NotificationKind::Error, SUBJECT, &err.to_string());
            }
        }
    }
}

/// Controller of the ranking dialog.
#[derive(Clone)]
pub struct RankingModalController {
    inner: Arc<Inner>,
}

impl RankingModalController {
    /// Create a closed dialog reading ranking lines from `collection`.
    ///
    /// `import` is the child dialog opened by [`Self::import_leaderboard`].
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        collection: impl Into<String>,
        import: Option<Arc<dyn ModalHandle<Seed<RankingScope>>>>,
    ) -> Self {
        let session = Session::default();
        let (updates, _receiver) = watch::channel(session.snapshot());
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                collection: collection.into(),
                import,
                session: Mutex::new(session),
                updates,
            }),
        }
    }

    /// Show the ranking of the seed's sweepstake map.
    ///
    /// A seed without a map raises a warning and leaves the dialog closed.
    pub fn open(&self, seed: RankingSeed) {
        let inner = &self.inner;
        let Some(map) = seed.sweepstake_map.clone() else {
            {
                let mut session = inner.lock();
                if inner.apply(&mut session, ModalEvent::Open { existing: false }) {
                    inner.apply(&mut session, ModalEvent::Close);
                    session.seed = None;
                    session.rows.clear();
                    inner.publish(&session);
                }
            }
            warn!(collection = %inner.collection, "ranking opened without a sweepstake map");
            inner
                .notifier
                .notify(NotificationKind::Warning, SUBJECT, MAP_NOT_PROVIDED);
            return;
        };

        let token = {
            let mut session = inner.lock();
            if !inner.apply(&mut session, ModalEvent::Open { existing: true }) {
                return;
            }
            session.seed = Some(seed);
            session.rows.clear();
            inner.publish(&session);
            session.machine.token()
        };

        let scope = RecordScope::new()
            .with("map_id", map.map_id.as_str())
            .with("sweepstake_id", map.sweepstake_id.as_str());
        debug!(
            collection = %inner.collection,
            map_id = %map.map_id,
            sweepstake_id = %map.sweepstake_id,
            "loading ranking"
        );

        let query = inner.store.query(&inner.collection, &scope);
        let task_inner = Arc::clone(inner);
        let dispatched = dispatch(async move {
            let result = query.await.map_err(ModalError::Load);
            task_inner.finish_load(token, result);
        });

        if let Err(err) = dispatched {
            inner.finish_load(token, Err(err));
        }
    }

    /// Hide the dialog; an outstanding query becomes stale.
    pub fn close(&self) {
        let mut session = self.inner.lock();
        if self.inner.apply(&mut session, ModalEvent::Close) {
            session.seed = None;
            session.rows.clear();
            self.inner.publish(&session);
        }
    }

    /// Current observable state.
    pub fn snapshot(&self) -> RankingSnapshot {
        self.inner.updates.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<RankingSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Current phase.
    pub fn phase(&self) -> ModalPhase {
        self.inner.lock().machine.phase()
    }

    /// Whether the table shows its loading skeleton.
    pub fn is_loading(&self) -> bool {
        self.phase() == ModalPhase::Loading
    }

    /// Loaded ranking lines.
    pub fn rows(&self) -> Vec<RankingRow> {
        self.inner.lock().rows.clone()
    }

    /// Name and game mode of the map, when the backend embedded them.
    pub fn map_header(&self) -> Option<(String, String)> {
        let session = self.inner.lock();
        let map = session.seed.as_ref()?.sweepstake_map.as_ref()?.maps.as_ref()?;
        Some((map.name.clone(), map.map_type.clone()))
    }

    /// Whether the viewer may import a leaderboard: only the sweepstake's owner can.
    pub fn can_import(&self) -> bool {
        let session = self.inner.lock();
        session.machine.phase().is_visible()
            && session.seed.as_ref().is_some_and(owned_by_viewer)
    }

    /// Open the leaderboard import dialog for the current map.
    ///
    /// Returns `false` when the viewer is not the owner or no import dialog is wired.
    pub fn import_leaderboard(&self) -> bool {
        let scope = {
            let session = self.inner.lock();
            if !session.machine.phase().is_visible() {
                return false;
            }
            let Some(seed) = session.seed.as_ref().filter(|seed| owned_by_viewer(seed)) else {
                return false;
            };
            let Some(map) = seed.sweepstake_map.as_ref() else {
                return false;
            };
            RankingScope {
                user_id: seed.viewer.as_ref().map(|viewer| viewer.id.clone()),
                sweepstake_id: map.sweepstake_id.clone(),
                map_id: map.map_id.clone(),
            }
        };

        let Some(import) = self.inner.import.as_ref() else {
            debug!("no leaderboard import dialog wired");
            return false;
        };
        import.open(Seed::create(scope));
        true
    }
}

fn owned_by_viewer(seed: &RankingSeed) -> bool {
    match (&seed.viewer, &seed.sweepstake_map) {
        (Some(viewer), Some(map)) => viewer.id == map.user_id,
        _ => false,
    }
}

impl ModalHandle<RankingSeed> for RankingModalController {
    fn open(&self, seed: RankingSeed) {
        RankingModalController::open(self, seed);
    }
}
