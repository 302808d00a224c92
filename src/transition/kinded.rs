//! Transition table keyed by `(status, input kind)`.
//!
//! Instead of one hand-written function per status, each accepted input kind
//! of a status gets its own target status and context update. Inputs whose
//! kind is not registered for the current status are rejected with the list
//! of kinds that would have been accepted.

use crate::builder::KindedTableBuilder;
use crate::core::{Context, Input, State, Status};
use crate::engine::Scheduler;
use crate::transition::{TransitionError, TransitionFn, TransitionTable};
use std::collections::HashMap;
use std::sync::Arc;

/// Context update run when a kinded transition fires.
pub type ApplyFn<C, I> = Arc<dyn Fn(&C, I) -> C + Send + Sync>;

pub(crate) struct KindedTransition<S, C, I> {
    pub(crate) kind: &'static str,
    pub(crate) target: S,
    pub(crate) apply: ApplyFn<C, I>,
}

impl<S: Clone, C, I> Clone for KindedTransition<S, C, I> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            target: self.target.clone(),
            apply: Arc::clone(&self.apply),
        }
    }
}

/// Lookup of transitions by status and input kind.
///
/// Kinds are kept in registration order so rejections list them stably.
pub struct KindedTable<S: Status, C: Context, I: Input> {
    by_status: HashMap<S, Vec<KindedTransition<S, C, I>>>,
}

impl<S: Status, C: Context, I: Input> KindedTable<S, C, I> {
    /// Start building a table.
    pub fn builder() -> KindedTableBuilder<S, C, I> {
        KindedTableBuilder::new()
    }

    pub(crate) fn from_map(by_status: HashMap<S, Vec<KindedTransition<S, C, I>>>) -> Self {
        Self { by_status }
    }

    fn find(&self, status: &S, kind: &str) -> Option<&KindedTransition<S, C, I>> {
        self.by_status
            .get(status)?
            .iter()
            .find(|transition| transition.kind == kind)
    }

    /// Input kinds accepted from `status`, in registration order.
    pub fn accepted(&self, status: &S) -> Vec<&'static str> {
        self.by_status
            .get(status)
            .map(|transitions| transitions.iter().map(|t| t.kind).collect())
            .unwrap_or_default()
    }

    /// Whether `input` has a transition from `status` (pure).
    pub fn is_valid(&self, status: &S, input: &I) -> bool {
        self.find(status, input.kind()).is_some()
    }

    /// Compute the next state for `input` (pure).
    ///
    /// Fails with [`TransitionError::InvalidInput`] when the input kind is
    /// not registered for the current status.
    pub fn step(&self, state: &State<S, C>, input: I) -> Result<State<S, C>, TransitionError<S, I>> {
        let Some(transition) = self.find(state.status(), input.kind()) else {
            return Err(TransitionError::InvalidInput {
                accepted: self.accepted(state.status()),
                status: state.status().clone(),
                input,
            });
        };
        let context = (transition.apply)(state.context(), input);
        Ok(State::new(transition.target.clone(), context))
    }

    /// Convert into a per-status table the engine can run.
    ///
    /// Every status with at least one kind gets a transition that performs
    /// [`step`](Self::step); the schedule capability is not used.
    pub fn into_table(self) -> TransitionTable<S, C, I> {
        let shared = Arc::new(self);
        let transitions = shared
            .by_status
            .keys()
            .map(|status| {
                let table = Arc::clone(&shared);
                let transition: TransitionFn<S, C, I> = Arc::new(
                    move |state: &State<S, C>, _scheduler: &Scheduler<S, C, I>, input: I| {
                        table.step(state, input)
                    },
                );
                (status.clone(), transition)
            })
            .collect();
        TransitionTable::from_map(transitions)
    }
}

impl<S: Status, C: Context, I: Input> Clone for KindedTable<S, C, I> {
    fn clone(&self) -> Self {
        Self {
            by_status: self.by_status.clone(),
        }
    }
}
