//! Status change history.
//!
//! Provides immutable tracking of applied transitions over time, used by
//! the synchronous [`Machine`](crate::machine::Machine).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single applied transition.
///
/// # Example
///
/// ```rust
/// use statefold::core::StatusChange;
/// use chrono::Utc;
///
/// let change = StatusChange {
///     from: "Off",
///     to: "On",
///     input_kind: "Toggle".to_string(),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(change.input_kind, "Toggle");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusChange<S> {
    /// The status being transitioned from
    pub from: S,
    /// The status being transitioned to
    pub to: S,
    /// Kind of the input that drove the transition
    pub input_kind: String,
    /// When the transition was applied
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of status changes.
///
/// History is immutable - `record` returns a new history with the change
/// appended.
///
/// # Example
///
/// ```rust
/// use statefold::core::{StatusChange, StatusHistory};
/// use chrono::Utc;
///
/// let history = StatusHistory::new()
///     .record(StatusChange {
///         from: "Start",
///         to: "Middle",
///         input_kind: "Next".to_string(),
///         timestamp: Utc::now(),
///     })
///     .record(StatusChange {
///         from: "Middle",
///         to: "End",
///         input_kind: "Next".to_string(),
///         timestamp: Utc::now(),
///     });
///
/// assert_eq!(history.get_path(), vec![&"Start", &"Middle", &"End"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusHistory<S> {
    changes: Vec<StatusChange<S>>,
}

impl<S> Default for StatusHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StatusHistory<S> {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
        }
    }

    /// Get all changes, oldest first.
    pub fn changes(&self) -> &[StatusChange<S>] {
        &self.changes
    }

    /// Number of recorded changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Get the path of statuses traversed.
    ///
    /// The first change's `from`, then the `to` of every change.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::with_capacity(self.changes.len() + 1);
        if let Some(first) = self.changes.first() {
            path.push(&first.from);
        }
        for change in &self.changes {
            path.push(&change.to);
        }
        path
    }

    /// Elapsed time between the first and last recorded change.
    ///
    /// Returns `None` when empty.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.changes.first()?, self.changes.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }
}

impl<S: Clone> StatusHistory<S> {
    /// Record a change, returning a new history.
    ///
    /// This does not mutate the existing history.
    pub fn record(&self, change: StatusChange<S>) -> Self {
        let mut changes = self.changes.clone();
        changes.push(change);
        Self { changes }
    }
}
