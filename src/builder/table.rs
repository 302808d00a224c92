//! Builder for per-status transition tables.

use crate::builder::error::BuildError;
use crate::core::{Context, Input, State, Status};
use crate::engine::Scheduler;
use crate::transition::{TransitionError, TransitionFn, TransitionTable};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for [`TransitionTable`] with a fluent API.
///
/// Registering a second transition for the same status replaces the first:
/// the last registration wins.
pub struct TransitionTableBuilder<S: Status, C: Context, I: Input> {
    transitions: HashMap<S, TransitionFn<S, C, I>>,
}

impl<S: Status, C: Context, I: Input> TransitionTableBuilder<S, C, I> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
        }
    }

    /// Register the transition for `status`.
    pub fn register<F>(mut self, status: S, transition: F) -> Self
    where
        F: Fn(&State<S, C>, &Scheduler<S, C, I>, I) -> Result<State<S, C>, TransitionError<S, I>>
            + Send
            + Sync
            + 'static,
    {
        self.insert(status, Arc::new(transition));
        self
    }

    /// Register every transition of an existing table.
    ///
    /// Entries from `table` replace earlier registrations for the same status.
    pub fn merge(mut self, table: TransitionTable<S, C, I>) -> Self {
        for (status, transition) in table.into_map() {
            self.insert(status, transition);
        }
        self
    }

    pub(crate) fn insert(&mut self, status: S, transition: TransitionFn<S, C, I>) {
        if self.transitions.contains_key(&status) {
            tracing::debug!(status = status.name(), "transition.register.replaced");
        }
        self.transitions.insert(status, transition);
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Build the table.
    /// Returns an error if nothing was registered.
    pub fn build(self) -> Result<TransitionTable<S, C, I>, BuildError> {
        if self.transitions.is_empty() {
            return Err(BuildError::NoTransitions);
        }
        Ok(TransitionTable::from_map(self.transitions))
    }
}

impl<S: Status, C: Context, I: Input> Default for TransitionTableBuilder<S, C, I> {
    fn default() -> Self {
        Self::new()
    }
}
