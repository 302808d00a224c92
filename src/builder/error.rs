//! Build errors for transition tables and engines.

use thiserror::Error;

/// Errors that can occur when building tables, machines and engines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("No transitions defined. Register at least one transition")]
    NoTransitions,

    #[error("Status \"{status}\" is reachable and not final but has no outgoing transitions")]
    MissingTransitions { status: String },
}
