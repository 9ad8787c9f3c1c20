use thiserror::Error;

/// Lifecycle phases of a record dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalPhase {
    /// Dialog hidden; no session data is kept.
    #[default]
    Closed,
    /// Dialog visible while the record under edit is fetched.
    Loading,
    /// Dialog visible and editable.
    Ready,
    /// Mutation in flight; the dialog cannot be closed or reopened.
    Submitting,
}

impl ModalPhase {
    /// Whether the dialog is shown in this phase.
    pub fn is_visible(self) -> bool {
        !matches!(self, ModalPhase::Closed)
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalEvent {
    /// Parent asked to show the dialog; `existing` when a record must be loaded first.
    Open {
        /// Whether the seed references an existing record.
        existing: bool,
    },
    /// The record fetch for the current session resolved.
    LoadResolved,
    /// The record fetch for the current session failed.
    LoadFailed,
    /// The draft passed validation and the mutation is being dispatched.
    SubmitAccepted,
    /// The mutation succeeded.
    MutationResolved,
    /// The mutation failed.
    MutationFailed,
    /// User cancelled the dialog.
    Close,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: ModalPhase,
    /// The event that cannot be applied from this phase.
    pub event: ModalEvent,
}

/// Token identifying the session an asynchronous request was dispatched for.
///
/// Every `Open` and `Close` starts a new session; results carrying an older
/// token are stale and must be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Session counter this token was issued for.
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: ModalPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Session counter (increments on each open or close).
    pub generation: u64,
}

/// State machine driving one dialog instance.
#[derive(Debug, Clone, Default)]
pub struct ModalStateMachine {
    phase: ModalPhase,
    version: usize,
    generation: u64,
}

impl ModalStateMachine {
    /// Create a new state machine initialised in the closed state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    /// Token for requests dispatched during the current session.
    pub fn token(&self) -> RequestToken {
        RequestToken(self.generation)
    }

    /// Whether `token` was issued for the current session.
    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.generation
    }

    /// Whether a result for `token` may still be applied while in `expected`.
    pub fn accepts(&self, token: RequestToken, expected: ModalPhase) -> bool {
        self.is_current(token) && self.phase == expected
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            generation: self.generation,
        }
    }

    /// Apply `event`, returning the new phase.
    ///
    /// Opening or closing starts a new session, which invalidates every
    /// outstanding [`RequestToken`].
    pub fn apply(&mut self, event: ModalEvent) -> Result<ModalPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;

        if matches!(event, ModalEvent::Open { .. } | ModalEvent::Close) {
            self.generation += 1;
        }
        self.phase = next;
        self.version += 1;

        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: ModalEvent) -> Result<ModalPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (
                ModalPhase::Closed | ModalPhase::Loading | ModalPhase::Ready,
                ModalEvent::Open { existing: true },
            ) => ModalPhase::Loading,
            (
                ModalPhase::Closed | ModalPhase::Loading | ModalPhase::Ready,
                ModalEvent::Open { existing: false },
            ) => ModalPhase::Ready,
            (ModalPhase::Loading, ModalEvent::LoadResolved) => ModalPhase::Ready,
            (ModalPhase::Loading, ModalEvent::LoadFailed) => ModalPhase::Closed,
            (ModalPhase::Ready, ModalEvent::SubmitAccepted) => ModalPhase::Submitting,
            (ModalPhase::Submitting, ModalEvent::MutationResolved) => ModalPhase::Closed,
            (ModalPhase::Submitting, ModalEvent::MutationFailed) => ModalPhase::Ready,
            (
                ModalPhase::Closed | ModalPhase::Loading | ModalPhase::Ready,
                ModalEvent::Close,
            ) => ModalPhase::Closed,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut ModalStateMachine, event: ModalEvent) -> ModalPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_closed() {
        let sm = ModalStateMachine::new();
        assert_eq!(sm.phase(), ModalPhase::Closed);
        assert!(!sm.phase().is_visible());
    }

    #[test]
    fn create_goes_straight_to_ready() {
        let mut sm = ModalStateMachine::new();
        assert_eq!(
            apply(&mut sm, ModalEvent::Open { existing: false }),
            ModalPhase::Ready
        );
    }

    #[test]
    fn full_edit_happy_path() {
        let mut sm = ModalStateMachine::new();

        assert_eq!(
            apply(&mut sm, ModalEvent::Open { existing: true }),
            ModalPhase::Loading
        );
        assert_eq!(apply(&mut sm, ModalEvent::LoadResolved), ModalPhase::Ready);
        assert_eq!(apply(&mut sm, ModalEvent::SubmitAccepted), ModalPhase::Submitting);
        assert_eq!(apply(&mut sm, ModalEvent::MutationResolved), ModalPhase::Closed);
        assert_eq!(sm.snapshot().version, 4);
    }

    #[test]
    fn load_failure_closes() {
        let mut sm = ModalStateMachine::new();
        apply(&mut sm, ModalEvent::Open { existing: true });
        assert_eq!(apply(&mut sm, ModalEvent::LoadFailed), ModalPhase::Closed);
    }

    #[test]
    fn mutation_failure_returns_to_ready() {
        let mut sm = ModalStateMachine::new();
        apply(&mut sm, ModalEvent::Open { existing: false });
        apply(&mut sm, ModalEvent::SubmitAccepted);
        assert_eq!(apply(&mut sm, ModalEvent::MutationFailed), ModalPhase::Ready);
    }

    #[test]
    fn close_and_open_are_rejected_while_submitting() {
        let mut sm = ModalStateMachine::new();
        apply(&mut sm, ModalEvent::Open { existing: false });
        apply(&mut sm, ModalEvent::SubmitAccepted);
        let token = sm.token();

        let err = sm.apply(ModalEvent::Close).unwrap_err();
        assert_eq!(err.from, ModalPhase::Submitting);
        assert_eq!(err.event, ModalEvent::Close);
        assert!(sm.apply(ModalEvent::Open { existing: true }).is_err());

        assert!(sm.accepts(token, ModalPhase::Submitting));
    }

    #[test]
    fn reopening_invalidates_outstanding_tokens() {
        let mut sm = ModalStateMachine::new();
        apply(&mut sm, ModalEvent::Open { existing: true });
        let first = sm.token();

        assert_eq!(
            apply(&mut sm, ModalEvent::Open { existing: true }),
            ModalPhase::Loading
        );
        let second = sm.token();

        assert!(!sm.is_current(first));
        assert!(sm.accepts(second, ModalPhase::Loading));
        assert_ne!(first.generation(), second.generation());
    }

    #[test]
    fn closing_while_loading_invalidates_the_load() {
        let mut sm = ModalStateMachine::new();
        apply(&mut sm, ModalEvent::Open { existing: true });
        let token = sm.token();

        apply(&mut sm, ModalEvent::Close);

        assert!(!sm.accepts(token, ModalPhase::Loading));
        assert!(sm.apply(ModalEvent::LoadResolved).is_err());
    }

    #[test]
    fn closing_when_closed_is_a_no_op() {
        let mut sm = ModalStateMachine::new();
        assert_eq!(apply(&mut sm, ModalEvent::Close), ModalPhase::Closed);
    }

    #[test]
    fn submit_is_rejected_outside_ready() {
        let mut sm = ModalStateMachine::new();
        let err = sm.apply(ModalEvent::SubmitAccepted).unwrap_err();
        assert_eq!(err.from, ModalPhase::Closed);

        apply(&mut sm, ModalEvent::Open { existing: true });
        assert!(sm.apply(ModalEvent::SubmitAccepted).is_err());
    }
}
