//! Status trait and the immutable actor state value.
//!
//! An actor is a `(status, context)` pair. The status selects which
//! transition handles the next input; the context is opaque data carried
//! alongside it. Both are replaced wholesale by transitions, never mutated.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for actor statuses.
///
/// Statuses key the transition table, so they must be hashable and
/// comparable. All methods are pure.
///
/// # Example
///
/// ```rust
/// use statefold::core::Status;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Light {
///     On,
///     Off,
///     Broken,
/// }
///
/// impl Status for Light {
///     fn name(&self) -> &str {
///         match self {
///             Self::On => "On",
///             Self::Off => "Off",
///             Self::Broken => "Broken",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Broken)
///     }
/// }
/// ```
pub trait Status: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Get the status name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) status.
    ///
    /// Final statuses are not expected to have outgoing transitions.
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }
}

/// Marker for values usable as actor context.
///
/// Contexts are cloned into every snapshot handed to background work,
/// so they must be cheap enough to clone and safe to share.
pub trait Context: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Context for T {}

/// Immutable `(status, context)` pair.
///
/// Every `with_*` method returns a new value and leaves `self` untouched.
///
/// # Example
///
/// ```rust
/// use statefold::core::State;
///
/// let idle = State::new("idle", 0u32);
/// let busy = idle.with_both("busy", 1);
///
/// assert_eq!(idle.status(), &"idle");
/// assert_eq!(busy.status(), &"busy");
/// assert_eq!(*busy.context(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct State<S, C> {
    status: S,
    context: C,
}

impl<S, C> State<S, C> {
    /// Create a state from its parts.
    pub fn new(status: S, context: C) -> Self {
        Self { status, context }
    }

    /// Current status.
    pub fn status(&self) -> &S {
        &self.status
    }

    /// Current context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Split into `(status, context)`.
    pub fn into_parts(self) -> (S, C) {
        (self.status, self.context)
    }
}

impl<S: Clone, C: Clone> State<S, C> {
    /// New state with `status` and this state's context.
    pub fn with_status(&self, status: S) -> Self {
        Self {
            status,
            context: self.context.clone(),
        }
    }

    /// New state with this state's status and `context`.
    pub fn with_context(&self, context: C) -> Self {
        Self {
            status: self.status.clone(),
            context,
        }
    }

    /// New state with both parts replaced.
    pub fn with_both(&self, status: S, context: C) -> Self {
        Self { status, context }
    }
}
