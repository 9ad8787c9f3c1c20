//! Record-modal controllers: the lifecycle shared by every entity dialog.

pub mod controller;
pub mod ranking;
pub mod state_machine;

use std::{fmt::Debug, future::Future, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use tokio::runtime::Handle;

use crate::{
    cache::CacheInvalidator,
    dao::record_store::{RecordScope, RecordStore},
    error::ModalError,
    notify::Notifier,
    validation::{FormFields, FormSchema, ValidationTrigger},
};

pub use self::controller::{ModalController, ModalSnapshot, SubmissionState, SubmitOutcome};
pub use self::ranking::{
    RankingModalController, RankingScope, RankingSeed, RankingSnapshot, Viewer,
};
pub use self::state_machine::{ModalPhase, RequestToken};

/// Input to `open`: an optional record identifier plus the entity's scope fields.
///
/// Without an id the dialog creates a new record; with one it loads and edits it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seed<S> {
    /// Record to edit; `None` to create one.
    pub id: Option<String>,
    /// Fields fixed by the caller, such as the owning organizer.
    pub scope: S,
}

impl<S> Seed<S> {
    /// Seed for creating a new record within `scope`.
    pub fn create(scope: S) -> Self {
        Self { id: None, scope }
    }

    /// Seed for editing the record `id` within `scope`.
    pub fn edit(id: impl Into<String>, scope: S) -> Self {
        Self {
            id: Some(id.into()),
            scope,
        }
    }

    /// Whether this seed references an existing record.
    pub fn is_edit(&self) -> bool {
        self.id.is_some()
    }
}

/// Imperative handle given to a parent view: the only way it drives a dialog.
pub trait ModalHandle<S>: Send + Sync {
    /// Show the dialog for `seed`. Never fails; problems are notified.
    fn open(&self, seed: S);
}

/// Entity-specific half of a record dialog: what to load, how to map it into
/// a draft, how to validate it and what to send back.
pub trait RecordModal: Send + Sync + 'static {
    /// Scope fields carried by the seed (owner, parent ids...).
    type Scope: Clone + Debug + Default + PartialEq + Send + Sync + 'static;
    /// Record shape returned by the store.
    type Record: DeserializeOwned + Send + 'static;
    /// In-memory form state.
    type Draft: Clone + Debug + Default + PartialEq + FormFields + Send + Sync + 'static;
    /// Fields sent to the store on submit.
    type Payload: Serialize;

    /// Human readable subject used in notifications (e.g. "Player").
    fn subject(&self) -> &str;
    /// Collection the records live in; also the invalidation key.
    fn collection(&self) -> &str;
    /// Validation schema of the draft.
    fn schema(&self) -> &FormSchema;
    /// Store filters restricting the fetch to the seed's scope.
    fn fetch_scope(&self, scope: &Self::Scope) -> RecordScope;
    /// Editable projection of a fetched record, resolving references to display objects.
    fn populate(&self, record: Self::Record) -> Self::Draft;
    /// Mutation payload for `draft`, reducing display objects to identifiers.
    fn payload(&self, seed: &Seed<Self::Scope>, draft: &Self::Draft) -> Self::Payload;

    /// Detail of the success notification.
    fn success_detail(&self, editing: bool) -> String {
        if editing {
            "updated successfully".into()
        } else {
            "created successfully".into()
        }
    }
}

/// Collaborators injected into every controller.
#[derive(Clone)]
pub struct ModalContext {
    pub store: Arc<dyn RecordStore>,
    pub notifier: Arc<dyn Notifier>,
    pub invalidator: Arc<dyn CacheInvalidator>,
    pub validation_trigger: ValidationTrigger,
}

/// Spawn `task` on the current Tokio runtime.
fn dispatch<F>(task: F) -> Result<(), ModalError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = Handle::try_current().map_err(|_| ModalError::NoRuntime)?;
    handle.spawn(task);
    Ok(())
}
