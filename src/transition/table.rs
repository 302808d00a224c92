//! Per-status transition table used by the engine loop.

use crate::builder::TransitionTableBuilder;
use crate::core::{Context, Input, State, Status};
use crate::engine::Scheduler;
use crate::transition::TransitionError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Function applied to the current state when an input arrives.
///
/// Runs synchronously on the engine loop. It receives the current state,
/// the schedule capability of the running engine and the input, and returns
/// the next state. It must not block for long: no other input is processed
/// while it runs.
pub type TransitionFn<S, C, I> = Arc<
    dyn Fn(&State<S, C>, &Scheduler<S, C, I>, I) -> Result<State<S, C>, TransitionError<S, I>>
        + Send
        + Sync,
>;

/// Mapping from status to exactly one transition function.
pub struct TransitionTable<S: Status, C: Context, I: Input> {
    transitions: HashMap<S, TransitionFn<S, C, I>>,
}

impl<S: Status, C: Context, I: Input> TransitionTable<S, C, I> {
    /// Start building a table.
    pub fn builder() -> TransitionTableBuilder<S, C, I> {
        TransitionTableBuilder::new()
    }

    pub(crate) fn from_map(transitions: HashMap<S, TransitionFn<S, C, I>>) -> Self {
        Self { transitions }
    }

    /// Insert or replace the transition for `status`.
    ///
    /// Returns the previous transition, if any.
    pub(crate) fn insert(
        &mut self,
        status: S,
        transition: TransitionFn<S, C, I>,
    ) -> Option<TransitionFn<S, C, I>> {
        self.transitions.insert(status, transition)
    }

    pub(crate) fn into_map(self) -> HashMap<S, TransitionFn<S, C, I>> {
        self.transitions
    }

    /// Transition registered for `status`.
    pub fn get(&self, status: &S) -> Option<&TransitionFn<S, C, I>> {
        self.transitions.get(status)
    }

    /// Whether `status` has a transition.
    pub fn contains(&self, status: &S) -> bool {
        self.transitions.contains_key(status)
    }

    /// Statuses with a registered transition, in no particular order.
    pub fn statuses(&self) -> impl Iterator<Item = &S> {
        self.transitions.keys()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Look up the transition for the current status and run it.
    ///
    /// Fails with [`TransitionError::Unregistered`] when the status has no
    /// transition; the input is carried back inside the error.
    pub fn apply(
        &self,
        state: &State<S, C>,
        scheduler: &Scheduler<S, C, I>,
        input: I,
    ) -> Result<State<S, C>, TransitionError<S, I>> {
        let Some(transition) = self.transitions.get(state.status()) else {
            return Err(TransitionError::Unregistered {
                status: state.status().clone(),
                input,
            });
        };
        transition(state, scheduler, input)
    }
}

impl<S: Status, C: Context, I: Input> Clone for TransitionTable<S, C, I> {
    fn clone(&self) -> Self {
        Self {
            transitions: self.transitions.clone(),
        }
    }
}

impl<S: Status, C: Context, I: Input> Default for TransitionTable<S, C, I> {
    fn default() -> Self {
        Self {
            transitions: HashMap::new(),
        }
    }
}

impl<S: Status, C: Context, I: Input> fmt::Debug for TransitionTable<S, C, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.transitions.keys()).finish()
    }
}
