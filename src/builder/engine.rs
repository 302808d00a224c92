//! Builder for engines.

use crate::builder::error::BuildError;
use crate::builder::TransitionTableBuilder;
use crate::core::{Context, Input, State, Status};
use crate::engine::{Engine, EngineConfig, Scheduler};
use crate::observe::{EngineObserver, TracingObserver};
use crate::transition::{TransitionError, TransitionTable};
use std::sync::Arc;

/// Builder for constructing an [`Engine`] with a fluent API.
pub struct EngineBuilder<S: Status, C: Context, I: Input> {
    transitions: TransitionTableBuilder<S, C, I>,
    config: EngineConfig,
    observer: Option<Arc<dyn EngineObserver<S, I>>>,
}

impl<S: Status, C: Context, I: Input> EngineBuilder<S, C, I> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            transitions: TransitionTableBuilder::new(),
            config: EngineConfig::default(),
            observer: None,
        }
    }

    /// Register the transition for `status`; the last registration wins.
    pub fn register<F>(mut self, status: S, transition: F) -> Self
    where
        F: Fn(&State<S, C>, &Scheduler<S, C, I>, I) -> Result<State<S, C>, TransitionError<S, I>>
            + Send
            + Sync
            + 'static,
    {
        self.transitions = self.transitions.register(status, transition);
        self
    }

    /// Add every transition of a prebuilt table.
    pub fn table(mut self, table: TransitionTable<S, C, I>) -> Self {
        self.transitions = self.transitions.merge(table);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the observer. Defaults to [`TracingObserver`].
    pub fn observer(mut self, observer: impl EngineObserver<S, I>) -> Self {
        let observer: Arc<dyn EngineObserver<S, I>> = Arc::new(observer);
        self.observer = Some(observer);
        self
    }

    /// Build the engine.
    /// Returns an error if no transition was registered.
    pub fn build(self) -> Result<Engine<S, C, I>, BuildError> {
        let table = self.transitions.build()?;
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver));
        Ok(Engine::from_parts(table, self.config, observer))
    }
}

impl<S: Status, C: Context, I: Input> Default for EngineBuilder<S, C, I> {
    fn default() -> Self {
        Self::new()
    }
}
