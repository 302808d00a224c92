//! Transition failures.

use crate::core::{Input, Status};
use thiserror::Error;

/// Errors produced when an input cannot be applied to the current state.
///
/// All variants carry the offending status; the lookup failures also hand
/// the input back so the caller can decide what to do with it.
#[derive(Debug, Error)]
pub enum TransitionError<S: Status, I: Input> {
    #[error("No transition registered for status \"{}\"; input {:?} dropped", .status.name(), .input)]
    Unregistered { status: S, input: I },

    #[error(
        "Value {:?} of kind \"{}\" is not a valid input from status \"{}\". Valid input kinds: {}",
        .input,
        .input.kind(),
        .status.name(),
        .accepted.join(", ")
    )]
    InvalidInput {
        input: I,
        status: S,
        accepted: Vec<&'static str>,
    },

    #[error("Transition from status \"{}\" failed: {}", .status.name(), .reason)]
    Failed { status: S, reason: String },
}

impl<S: Status, I: Input> TransitionError<S, I> {
    /// Convenience constructor for transitions that refuse an input.
    pub fn failed(status: S, reason: impl Into<String>) -> Self {
        Self::Failed {
            status,
            reason: reason.into(),
        }
    }

    /// Status the actor was in when the failure happened.
    pub fn status(&self) -> &S {
        match self {
            Self::Unregistered { status, .. }
            | Self::InvalidInput { status, .. }
            | Self::Failed { status, .. } => status,
        }
    }

    /// The rejected input, when the failure came from a lookup.
    pub fn input(&self) -> Option<&I> {
        match self {
            Self::Unregistered { input, .. } | Self::InvalidInput { input, .. } => Some(input),
            Self::Failed { .. } => None,
        }
    }

    /// Input kinds that would have been accepted from [`status`](Self::status).
    pub fn accepted(&self) -> &[&'static str] {
        match self {
            Self::InvalidInput { accepted, .. } => accepted,
            Self::Unregistered { .. } | Self::Failed { .. } => &[],
        }
    }

    /// Recover the rejected input.
    pub fn into_input(self) -> Option<I> {
        match self {
            Self::Unregistered { input, .. } | Self::InvalidInput { input, .. } => Some(input),
            Self::Failed { .. } => None,
        }
    }
}
