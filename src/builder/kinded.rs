//! Builder for kinded transition tables.

use crate::builder::error::BuildError;
use crate::core::{Context, Input, Status};
use crate::machine::Machine;
use crate::transition::{KindedTable, KindedTransition};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for [`KindedTable`] with a fluent API.
///
/// # Example
///
/// ```
/// use statefold::builder::KindedTableBuilder;
/// use statefold::{input_enum, status_enum};
///
/// status_enum! {
///     enum Light {
///         On,
///         Off,
///     }
/// }
///
/// input_enum! {
///     enum Command {
///         Toggle,
///     }
/// }
///
/// let mut machine = KindedTableBuilder::<Light, u32, Command>::new()
///     .on(Light::Off, "Toggle", Light::On, |count, _| count + 1)
///     .on(Light::On, "Toggle", Light::Off, |count, _| count + 1)
///     .build_machine(Light::Off, 0)
///     .unwrap();
///
/// machine.apply(Command::Toggle).unwrap();
/// assert_eq!(machine.status(), &Light::On);
/// assert_eq!(*machine.context(), 1);
/// ```
pub struct KindedTableBuilder<S: Status, C: Context, I: Input> {
    by_status: HashMap<S, Vec<KindedTransition<S, C, I>>>,
}

impl<S: Status, C: Context, I: Input> KindedTableBuilder<S, C, I> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            by_status: HashMap::new(),
        }
    }

    /// Register a transition from `from` to `to` for inputs of `kind`,
    /// updating the context with `apply`.
    ///
    /// A later registration for the same `(from, kind)` replaces the earlier
    /// one in place.
    pub fn on<F>(mut self, from: S, kind: &'static str, to: S, apply: F) -> Self
    where
        F: Fn(&C, I) -> C + Send + Sync + 'static,
    {
        let transition = KindedTransition {
            kind,
            target: to,
            apply: Arc::new(apply),
        };
        let transitions = self.by_status.entry(from).or_default();
        match transitions.iter_mut().find(|existing| existing.kind == kind) {
            Some(existing) => *existing = transition,
            None => transitions.push(transition),
        }
        self
    }

    /// Register a transition that leaves the context unchanged.
    pub fn on_kind(self, from: S, kind: &'static str, to: S) -> Self {
        self.on(from, kind, to, |context: &C, _| context.clone())
    }

    /// Build the table.
    ///
    /// Every non-final status that some transition targets must itself have
    /// outgoing transitions.
    pub fn build(self) -> Result<KindedTable<S, C, I>, BuildError> {
        if self.by_status.is_empty() {
            return Err(BuildError::NoTransitions);
        }

        let dead_end = self
            .by_status
            .values()
            .flatten()
            .map(|transition| &transition.target)
            .find(|target| !target.is_final() && !self.by_status.contains_key(*target));
        if let Some(status) = dead_end {
            return Err(BuildError::MissingTransitions {
                status: status.name().to_string(),
            });
        }

        Ok(KindedTable::from_map(self.by_status))
    }

    /// Build the table and wrap it in a synchronous [`Machine`].
    pub fn build_machine(self, status: S, context: C) -> Result<Machine<S, C, I>, BuildError> {
        Ok(Machine::new(self.build()?, status, context))
    }
}

impl<S: Status, C: Context, I: Input> Default for KindedTableBuilder<S, C, I> {
    fn default() -> Self {
        Self::new()
    }
}
