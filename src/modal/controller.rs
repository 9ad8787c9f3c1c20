//! Generic record-dialog controller.
//!
//! A [`ModalController`] owns the visibility, draft, field errors and
//! submission state of one dialog instance. Remote calls are dispatched onto
//! the runtime and their results are applied only if they belong to the
//! current session; anything older is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use validator::ValidationError;

use crate::{
    dao::storage::StorageError,
    error::ModalError,
    notify::NotificationKind,
    validation::{self, ValidationReport, ValidationTrigger},
};

use super::{
    ModalContext, ModalHandle, RecordModal, Seed, dispatch,
    state_machine::{ModalEvent, ModalPhase, ModalStateMachine, RequestToken},
};

/// Progress of the last submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    /// Nothing submitted during this session.
    #[default]
    Idle,
    /// A mutation is in flight; controls are disabled.
    InFlight,
    /// The last mutation finished, successfully or not.
    Settled,
}

/// Immediate result of [`ModalController::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The draft was valid and the mutation has been dispatched.
    Dispatched,
    /// The draft failed validation; nothing was sent.
    Invalid(ValidationReport),
    /// A mutation is already in flight.
    Busy,
    /// The dialog is closed or still loading.
    NotReady,
    /// The mutation could not be dispatched; the failure was notified.
    Failed,
}

/// Observable state of a dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalSnapshot<S, D> {
    /// Lifecycle phase.
    pub phase: ModalPhase,
    /// Seed of the current session, `None` while closed.
    pub seed: Option<Seed<S>>,
    /// Values shown in the form.
    pub draft: D,
    /// Field errors to render inline.
    pub errors: ValidationReport,
    /// Outcome of the latest mutation.
    pub submission: SubmissionState,
    /// Session counter, bumped by every open and close.
    pub generation: u64,
}

impl<S, D> ModalSnapshot<S, D> {
    /// Whether the dialog is shown.
    pub fn is_visible(&self) -> bool {
        self.phase.is_visible()
    }
}

/// Snapshot type published by a [`ModalController`] driving `M`.
pub type SnapshotOf<M> = ModalSnapshot<<M as RecordModal>::Scope, <M as RecordModal>::Draft>;

struct Session<M: RecordModal> {
    machine: ModalStateMachine,
    seed: Option<Seed<M::Scope>>,
    draft: M::Draft,
    errors: ValidationReport,
    submission: SubmissionState,
    /// A submit was attempted during this session; edits re-validate from now on.
    submitted: bool,
}

impl<M: RecordModal> Session<M> {
    fn new() -> Self {
        Self {
            machine: ModalStateMachine::new(),
            seed: None,
            draft: M::Draft::default(),
            errors: ValidationReport::new(),
            submission: SubmissionState::Idle,
            submitted: false,
        }
    }

    fn start(&mut self, seed: Seed<M::Scope>) {
        self.seed = Some(seed);
        self.draft = M::Draft::default();
        self.errors = ValidationReport::new();
        self.submission = SubmissionState::Idle;
        self.submitted = false;
    }

    fn discard(&mut self) {
        self.seed = None;
        self.draft = M::Draft::default();
        self.errors = ValidationReport::new();
        self.submitted = false;
    }

    fn snapshot(&self) -> SnapshotOf<M> {
        ModalSnapshot {
            phase: self.machine.phase(),
            seed: self.seed.clone(),
            draft: self.draft.clone(),
            errors: self.errors.clone(),
            submission: self.submission,
            generation: self.machine.token().generation(),
        }
    }
}

struct Inner<M: RecordModal> {
    modal: M,
    context: ModalContext,
    session: Mutex<Session<M>>,
    updates: watch::Sender<SnapshotOf<M>>,
}

impl<M: RecordModal> Inner<M> {
    fn lock(&self) -> MutexGuard<'_, Session<M>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &Session<M>) {
        self.updates.send_replace(session.snapshot());
    }

    fn transition(&self, session: &mut Session<M>, event: ModalEvent) -> bool {
        match session.machine.apply(event) {
            Ok(_) => true,
            Err(err) => {
                debug!(collection = self.modal.collection(), error = %err, "transition ignored");
                false
            }
        }
    }

    fn notify_failure(&self, err: &ModalError) {
        self.context.notifier.notify(
            NotificationKind::Error,
            self.modal.subject(),
            &err.to_string(),
        );
    }

    fn finish_load(&self, token: RequestToken, id: &str, result: Result<Option<Value>, ModalError>) {
        let collection = self.modal.collection();
        let mut session = self.lock();
        if !session.machine.accepts(token, ModalPhase::Loading) {
            debug!(
                %collection,
                %id,
                generation = token.generation(),
                "dropping stale load result"
            );
            return;
        }

        let record = result
            .and_then(|found| {
                found.ok_or_else(|| ModalError::Load(StorageError::not_found(collection, id)))
            })
            .and_then(|value| {
                serde_json::from_value::<M::Record>(value).map_err(ModalError::Decode)
            });

        match record {
            Ok(record) => {
                session.draft = self.modal.populate(record);
                self.transition(&mut session, ModalEvent::LoadResolved);
                self.publish(&session);
                debug!(%collection, %id, "record loaded into draft");
            }
            Err(err) => {
                self.transition(&mut session, ModalEvent::LoadFailed);
                session.discard();
                self.publish(&session);
                drop(session);

                warn!(%collection, %id, error = %err, "failed to load record; closing dialog");
                self.notify_failure(&err);
            }
        }
    }

    fn finish_mutation(&self, token: RequestToken, editing: bool, result: Result<(), ModalError>) {
        let collection = self.modal.collection();
        let mut session = self.lock();
        if !session.machine.accepts(token, ModalPhase::Submitting) {
            debug!(
                %collection,
                generation = token.generation(),
                "dropping stale mutation result"
            );
            return;
        }

        session.submission = SubmissionState::Settled;
        match result {
            Ok(()) => {
                self.transition(&mut session, ModalEvent::MutationResolved);
                session.discard();
                self.publish(&session);
                drop(session);

                info!(%collection, editing, "record saved");
                self.context.notifier.notify(
                    NotificationKind::Success,
                    self.modal.subject(),
                    &self.modal.success_detail(editing),
                );
                self.context.invalidator.invalidate(collection);
            }
            Err(err) => {
                self.transition(&mut session, ModalEvent::MutationFailed);
                self.publish(&session);
                drop(session);

                warn!(%collection, error = %err, "failed to save record; keeping draft for retry");
                self.notify_failure(&err);
            }
        }
    }
}

/// Lifecycle controller for one record dialog instance.
///
/// Cloning yields another handle to the same dialog.
pub struct ModalController<M: RecordModal> {
    inner: Arc<Inner<M>>,
}

impl<M: RecordModal> Clone for ModalController<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: RecordModal> ModalController<M> {
    /// Create a closed dialog for `modal`, wired to the given collaborators.
    pub fn new(modal: M, context: ModalContext) -> Self {
        let session = Session::<M>::new();
        let (updates, _receiver) = watch::channel(session.snapshot());
        Self {
            inner: Arc::new(Inner {
                modal,
                context,
                session: Mutex::new(session),
                updates,
            }),
        }
    }

    /// Entity adapter driving this dialog.
    pub fn modal(&self) -> &M {
        &self.inner.modal
    }

    /// Show the dialog for `seed`.
    ///
    /// Without an id the dialog is immediately editable with an empty draft.
    /// With an id the dialog shows a loading state while the record is
    /// fetched; a later `open` or `close` makes that fetch stale. Ignored
    /// while a mutation is in flight.
    pub fn open(&self, seed: Seed<M::Scope>) {
        let collection = self.inner.modal.collection();
        let token = {
            let mut session = self.inner.lock();
            if !self.inner.transition(
                &mut session,
                ModalEvent::Open {
                    existing: seed.is_edit(),
                },
            ) {
                return;
            }
            session.start(seed.clone());
            self.inner.publish(&session);
            session.machine.token()
        };

        let Seed { id, scope } = seed;
        let Some(id) = id else {
            debug!(%collection, "dialog opened for a new record");
            return;
        };

        debug!(%collection, %id, generation = token.generation(), "loading record");
        let scope = self.inner.modal.fetch_scope(&scope);
        let fetch = self.inner.context.store.fetch(collection, &id, &scope);
        let inner = Arc::clone(&self.inner);
        let task_id = id.clone();
        let dispatched = dispatch(async move {
            let result = fetch.await.map_err(ModalError::Load);
            inner.finish_load(token, &task_id, result);
        });

        if let Err(err) = dispatched {
            self.inner.finish_load(token, &id, Err(err));
        }
    }

    /// Cancel the dialog, discarding the draft. Ignored while a mutation is in flight.
    pub fn close(&self) {
        let mut session = self.inner.lock();
        if self.inner.transition(&mut session, ModalEvent::Close) {
            session.discard();
            self.inner.publish(&session);
        }
    }

    /// Form field binding: mutate the draft while the dialog is editable.
    ///
    /// `update` runs under the dialog lock and must not call back into the
    /// controller. Returns `false` when the dialog is not editable.
    pub fn edit<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut M::Draft),
    {
        let mut session = self.inner.lock();
        if session.machine.phase() != ModalPhase::Ready {
            return false;
        }

        update(&mut session.draft);

        let revalidate = match self.inner.context.validation_trigger {
            ValidationTrigger::OnChange => true,
            ValidationTrigger::OnSubmit => session.submitted,
        };
        if revalidate {
            session.errors = validation::validate(self.inner.modal.schema(), &session.draft);
        }

        self.inner.publish(&session);
        true
    }

    /// Validate a single field of the draft and update its inline error.
    pub fn validate_field(&self, name: &str) -> Option<ValidationError> {
        let schema = self.inner.modal.schema();
        let field = schema.rule(name)?.name;

        let mut session = self.inner.lock();
        if session.machine.phase() != ModalPhase::Ready {
            return None;
        }

        let error = validation::validate_field(schema, &session.draft, field);
        session.errors.set(field, error.clone());
        self.inner.publish(&session);
        error
    }

    /// Form submit action: validate the draft and, when valid, dispatch the mutation.
    pub fn submit(&self) -> SubmitOutcome {
        let inner = &self.inner;
        let collection = inner.modal.collection();

        let (token, payload, editing) = {
            let mut session = inner.lock();
            match session.machine.phase() {
                ModalPhase::Ready => {}
                ModalPhase::Submitting => {
                    debug!(%collection, "duplicate submit rejected");
                    return SubmitOutcome::Busy;
                }
                phase => {
                    debug!(%collection, ?phase, "submit ignored");
                    return SubmitOutcome::NotReady;
                }
            }

            session.submitted = true;
            let report = validation::validate(inner.modal.schema(), &session.draft);
            session.errors = report.clone();
            if !report.is_valid() {
                inner.publish(&session);
                debug!(
                    %collection,
                    fields = ?report.fields().collect::<Vec<_>>(),
                    "submit blocked by validation"
                );
                return SubmitOutcome::Invalid(report);
            }

            let seed = session.seed.clone().unwrap_or_default();
            let encoded = serde_json::to_value(inner.modal.payload(&seed, &session.draft));
            let payload = match encoded {
                Ok(payload) => payload,
                Err(source) => {
                    inner.publish(&session);
                    drop(session);
                    inner.notify_failure(&ModalError::Encode(source));
                    return SubmitOutcome::Failed;
                }
            };

            inner.transition(&mut session, ModalEvent::SubmitAccepted);
            session.submission = SubmissionState::InFlight;
            inner.publish(&session);
            (session.machine.token(), payload, seed.is_edit())
        };

        debug!(%collection, editing, "dispatching mutation");
        let upsert = inner.context.store.upsert(collection, payload);
        let task_inner = Arc::clone(inner);
        let dispatched = dispatch(async move {
            let result = upsert.await.map_err(ModalError::Mutation);
            task_inner.finish_mutation(token, editing, result);
        });

        match dispatched {
            Ok(()) => SubmitOutcome::Dispatched,
            Err(err) => {
                inner.finish_mutation(token, editing, Err(err));
                SubmitOutcome::Failed
            }
        }
    }

    /// Current observable state.
    pub fn snapshot(&self) -> SnapshotOf<M> {
        self.inner.updates.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<SnapshotOf<M>> {
        self.inner.updates.subscribe()
    }

    /// Current phase.
    pub fn phase(&self) -> ModalPhase {
        self.inner.lock().machine.phase()
    }

    /// Whether the dialog is shown.
    pub fn is_visible(&self) -> bool {
        self.phase().is_visible()
    }

    /// Whether the record under edit is still loading (fields show skeletons).
    pub fn is_loading(&self) -> bool {
        self.phase() == ModalPhase::Loading
    }

    /// Whether a mutation is in flight.
    pub fn is_submitting(&self) -> bool {
        self.phase() == ModalPhase::Submitting
    }

    /// Whether form controls must be disabled.
    pub fn controls_disabled(&self) -> bool {
        matches!(self.phase(), ModalPhase::Loading | ModalPhase::Submitting)
    }

    /// Copy of the current draft.
    pub fn draft(&self) -> M::Draft {
        self.inner.lock().draft.clone()
    }

    /// Current inline field errors.
    pub fn errors(&self) -> ValidationReport {
        self.inner.lock().errors.clone()
    }

    /// Label of the submit button: "Save" when editing, "Add" when creating.
    pub fn submit_label(&self) -> &'static str {
        let editing = self
            .inner
            .lock()
            .seed
            .as_ref()
            .is_some_and(|seed| seed.is_edit());
        if editing { "Save" } else { "Add" }
    }
}

impl<M: RecordModal> ModalHandle<Seed<M::Scope>> for ModalController<M> {
    fn open(&self, seed: Seed<M::Scope>) {
        ModalController::open(self, seed);
    }
}
