use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    cache::QueryCache,
    config::AppConfig,
    dao::{
        record_store::{MemoryRecordStore, RecordScope, RecordStore},
        storage::{StorageError, StorageResult},
    },
    dto::reference::ReferenceOption,
    modal::{ModalContext, ModalController, ModalHandle, RankingModalController, RankingScope, Seed},
    modals::{MapModal, PlayerModal, RankingImportModal},
    notify::NotificationHub,
};

/// Handle to the application state shared by every view.
pub type SharedState = Arc<AppState>;

/// Capacity of the notification and invalidation broadcast channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Central application state: configuration, record store and the shared
/// channels every dialog reports to.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn RecordStore>,
    notifications: Arc<NotificationHub>,
    cache: Arc<QueryCache>,
}

#[derive(Debug, Deserialize)]
struct PlayerOptionRow {
    id: String,
    name: String,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn RecordStore>) -> SharedState {
        Arc::new(Self {
            config,
            store,
            notifications: Arc::new(NotificationHub::new(DEFAULT_CHANNEL_CAPACITY)),
            cache: Arc::new(QueryCache::new(DEFAULT_CHANNEL_CAPACITY)),
        })
    }

    /// State backed by an in-process store.
    pub fn in_memory(config: AppConfig) -> SharedState {
        Self::new(config, Arc::new(MemoryRecordStore::new()))
    }

    /// Load the configuration and connect to the backend described by the environment.
    #[cfg(feature = "rest-store")]
    pub fn connect_from_env() -> anyhow::Result<SharedState> {
        use anyhow::Context;
        use tracing::info;

        use crate::dao::record_store::rest::{RestConfig, RestRecordStore};

        let config = AppConfig::load();
        let rest = RestConfig::from_env().context("failed to read backend configuration")?;
        let base_url = rest.base_url.clone();
        let store = RestRecordStore::connect(rest).context("failed to build backend client")?;
        info!(%base_url, "record store ready");

        Ok(Self::new(config, Arc::new(store)))
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Record store shared by every dialog.
    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.store)
    }

    /// Toast hub; UI layers subscribe to it.
    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    /// Listing cache invalidated by successful mutations.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Collaborators handed to every dialog controller.
    pub fn modal_context(&self) -> ModalContext {
        ModalContext {
            store: self.store(),
            notifier: self.notifications.clone(),
            invalidator: self.cache.clone(),
            validation_trigger: self.config.validation_trigger,
        }
    }

    /// New player dialog.
    pub fn player_modal(&self) -> ModalController<PlayerModal> {
        ModalController::new(
            PlayerModal::new(&self.config.collections.players, self.config.patents.clone()),
            self.modal_context(),
        )
    }

    /// New map dialog.
    pub fn map_modal(&self) -> ModalController<MapModal> {
        ModalController::new(
            MapModal::new(&self.config.collections.maps, self.config.map_types.clone()),
            self.modal_context(),
        )
    }

    /// New leaderboard import dialog offering `players` in its selector.
    pub fn ranking_import_modal(
        &self,
        players: Vec<ReferenceOption>,
    ) -> ModalController<RankingImportModal> {
        ModalController::new(
            RankingImportModal::new(&self.config.collections.rankings, players),
            self.modal_context(),
        )
    }

    /// New ranking dialog; `import` is opened by its leaderboard import action.
    pub fn ranking_modal(
        &self,
        import: Option<Arc<dyn ModalHandle<Seed<RankingScope>>>>,
    ) -> RankingModalController {
        RankingModalController::new(
            self.store(),
            self.notifications.clone(),
            &self.config.collections.rankings,
            import,
        )
    }

    /// Rows of `collection` within `scope`, served from the listing cache.
    pub async fn list_records(
        &self,
        collection: &str,
        scope: &RecordScope,
    ) -> StorageResult<Arc<Vec<Value>>> {
        self.cache.list(self.store.as_ref(), collection, scope).await
    }

    /// Player selector options of an organizer.
    pub async fn player_options(&self, user_id: Option<&str>) -> StorageResult<Vec<ReferenceOption>> {
        let collection = &self.config.collections.players;
        let scope = RecordScope::new().with_optional("user_id", user_id);
        let rows = self.list_records(collection, &scope).await?;

        rows.iter()
            .map(|row| {
                serde_json::from_value::<PlayerOptionRow>(row.clone())
                    .map(|player| ReferenceOption::new(player.id, player.name))
                    .map_err(|source| StorageError::Decode {
                        collection: collection.clone(),
                        source,
                    })
            })
            .collect()
    }
}
