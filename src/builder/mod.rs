//! Builder API for ergonomic table and engine construction.
//!
//! This module provides fluent builders and macros for creating transition
//! tables, engines and synchronous machines with minimal boilerplate.

pub mod engine;
pub mod error;
pub mod kinded;
pub mod macros;
pub mod table;

pub use engine::EngineBuilder;
pub use error::BuildError;
pub use kinded::KindedTableBuilder;
pub use table::TransitionTableBuilder;
