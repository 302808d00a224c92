//! Synchronous, single-owner state machine over a [`KindedTable`].
//!
//! No loop, no queues, no background work: each `apply` computes the next
//! state in place and records the status change.

use crate::core::{Context, Input, State, Status, StatusChange, StatusHistory};
use crate::transition::{KindedTable, TransitionError};
use chrono::Utc;

/// State machine that applies inputs on the caller's thread.
pub struct Machine<S: Status, C: Context, I: Input> {
    table: KindedTable<S, C, I>,
    state: State<S, C>,
    history: StatusHistory<S>,
}

impl<S: Status, C: Context, I: Input> Machine<S, C, I> {
    /// Create a machine in `(status, context)`.
    pub fn new(table: KindedTable<S, C, I>, status: S, context: C) -> Self {
        Self {
            table,
            state: State::new(status, context),
            history: StatusHistory::new(),
        }
    }

    /// Get current status (pure)
    pub fn status(&self) -> &S {
        self.state.status()
    }

    /// Get current context (pure)
    pub fn context(&self) -> &C {
        self.state.context()
    }

    pub fn state(&self) -> &State<S, C> {
        &self.state
    }

    /// Check if machine is in a final status (pure)
    pub fn is_final(&self) -> bool {
        self.state.status().is_final()
    }

    /// Whether `input` would be accepted from the current status (pure).
    pub fn is_valid(&self, input: &I) -> bool {
        self.table.is_valid(self.state.status(), input)
    }

    /// Input kinds accepted from the current status.
    pub fn accepted(&self) -> Vec<&'static str> {
        self.table.accepted(self.state.status())
    }

    /// Get status history (pure)
    pub fn history(&self) -> &StatusHistory<S> {
        &self.history
    }

    /// Apply `input` and move to the next state.
    ///
    /// On [`TransitionError::InvalidInput`] the state is left unchanged and
    /// nothing is recorded. Returns `self` so calls can be chained.
    pub fn apply(&mut self, input: I) -> Result<&mut Self, TransitionError<S, I>> {
        let input_kind = input.kind();
        let next = self.table.step(&self.state, input)?;

        let change = StatusChange {
            from: self.state.status().clone(),
            to: next.status().clone(),
            input_kind: input_kind.to_string(),
            timestamp: Utc::now(),
        };
        self.history = self.history.record(change);
        self.state = next;
        Ok(self)
    }
}
