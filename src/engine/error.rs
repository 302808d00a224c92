//! Engine lifecycle errors.

use thiserror::Error;

/// Errors returned synchronously by engine lifecycle calls and capabilities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine must be stopped to start")]
    AlreadyRunning,

    #[error("Engine must be started to accept inputs, work or stop requests")]
    NotRunning,

    #[error("Task \"{name}\" is already running")]
    TaskAlreadyRunning { name: String },

    #[error("Engine start requires a Tokio runtime context")]
    NoRuntime,

    #[error("Engine loop panicked: {0}")]
    LoopPanicked(String),
}
