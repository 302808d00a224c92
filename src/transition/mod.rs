//! Transition tables.
//!
//! Two flavors:
//!
//! - [`TransitionTable`]: one function per status. This is what the engine
//!   loop consults; the function decides how to handle every input shape,
//!   normally with a `match` on the input enum.
//! - [`KindedTable`]: one target status and context update per
//!   `(status, input kind)` pair. It can be stepped directly, driven by a
//!   [`Machine`](crate::machine::Machine), or converted into a
//!   [`TransitionTable`] for the engine.

mod error;
mod kinded;
mod table;

pub use error::TransitionError;
pub use kinded::{ApplyFn, KindedTable};
pub(crate) use kinded::KindedTransition;
pub use table::{TransitionFn, TransitionTable};
