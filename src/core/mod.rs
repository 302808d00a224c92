//! Core actor value types.
//!
//! This module contains the pure pieces of the actor model:
//! - Statuses via the `Status` trait
//! - Input events via the `Input` trait
//! - The immutable `(status, context)` pair, `State`
//! - Immutable history of applied transitions
//!
//! Nothing in here spawns, blocks, or logs.

mod history;
mod input;
mod state;

pub use history::{StatusChange, StatusHistory};
pub use input::Input;
pub use state::{Context, State, Status};
