//! The concurrent actor engine.
//!
//! An [`Engine`] owns a transition table and, while running, one loop task
//! that is the single writer of the actor state. Inputs arrive through a
//! [`Dispatcher`]; transitions enqueue background work through the
//! [`Scheduler`] they are handed. Work runs concurrently on the runtime and
//! talks back to the engine only by dispatching further inputs.
//!
//! # Example
//!
//! ```
//! use statefold::engine::Engine;
//! use statefold::{input_enum, status_enum};
//!
//! status_enum! {
//!     enum Light {
//!         On,
//!         Off,
//!     }
//! }
//!
//! input_enum! {
//!     enum Command {
//!         Toggle,
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut engine = Engine::<Light, u32, Command>::builder()
//!     .register(Light::Off, |state, _, _| Ok(state.with_both(Light::On, state.context() + 1)))
//!     .register(Light::On, |state, _, _| Ok(state.with_both(Light::Off, state.context() + 1)))
//!     .build()
//!     .unwrap();
//!
//! let lamp = engine.start(Light::Off, 0).unwrap();
//! let mut states = engine.subscribe().unwrap();
//! lamp.dispatch(Command::Toggle).unwrap();
//! states.wait_for(|state| *state.context() == 1).await.unwrap();
//!
//! let report = engine.stop().await.unwrap();
//! assert_eq!(report.tasks_joined, 0);
//! assert_eq!(engine.state().unwrap().status(), &Light::On);
//! # }
//! ```

mod cancellable;
mod capability;
mod config;
mod error;
mod queue;
mod run_loop;
mod tasks;

pub use capability::{Dispatcher, Scheduler, WorkResult};
pub use config::{EngineConfig, DEFAULT_POLL_INTERVAL};
pub use error::EngineError;
pub use queue::Inbox;
pub use tasks::{TaskId, TaskMeta, TaskOutcome};

pub(crate) use tasks::panic_message;

use crate::builder::EngineBuilder;
use crate::core::{Context, Input, State, Status};
use crate::observe::{notify, EngineObserver, LoopFault, TracingObserver};
use crate::transition::{TransitionError, TransitionTable};
use cancellable::CancellableTask;
use capability::NamedTasks;
use run_loop::{LoopExit, RunLoop};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::Instrument;

/// Whether an engine currently has a loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    Stopped,
    Running,
}

/// Summary of one `stop`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// Background tasks still in flight when the loop exited, now joined.
    pub tasks_joined: usize,
    /// How many of those failed or panicked.
    pub tasks_failed: usize,
    /// Inputs dispatched after the loop exited; never applied.
    pub inputs_discarded: usize,
    /// Work scheduled after the loop's final drain; never launched.
    pub work_discarded: usize,
}

struct Running<S: Status, C: Context, I: Input> {
    task: CancellableTask<LoopExit<S, C, I>>,
    dispatcher: Dispatcher<I>,
    states: watch::Receiver<State<S, C>>,
}

/// Lifecycle controller for one actor.
///
/// `Stopped --start--> Running --stop--> Stopped`, any number of times. Each
/// run gets fresh queues; capabilities from an earlier run fail with
/// [`EngineError::NotRunning`].
///
/// Dropping a running engine cancels its loop without waiting. Background
/// work still in flight is detached: it runs to completion but is never
/// joined or reported.
pub struct Engine<S: Status, C: Context, I: Input> {
    config: EngineConfig,
    table: Arc<TransitionTable<S, C, I>>,
    observer: Arc<dyn EngineObserver<S, I>>,
    running: Option<Running<S, C, I>>,
    last_state: Option<State<S, C>>,
}

impl<S: Status, C: Context, I: Input> Engine<S, C, I> {
    /// Engine with default config and the [`TracingObserver`].
    pub fn new(table: TransitionTable<S, C, I>) -> Self {
        Self::from_parts(table, EngineConfig::default(), Arc::new(TracingObserver))
    }

    pub fn builder() -> EngineBuilder<S, C, I> {
        EngineBuilder::new()
    }

    pub(crate) fn from_parts(
        table: TransitionTable<S, C, I>,
        config: EngineConfig,
        observer: Arc<dyn EngineObserver<S, I>>,
    ) -> Self {
        Self {
            config,
            table: Arc::new(table),
            observer,
            running: None,
            last_state: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn table(&self) -> &TransitionTable<S, C, I> {
        &self.table
    }

    /// Register the transition for `status`, replacing any earlier one.
    ///
    /// Only allowed while stopped.
    pub fn register<F>(&mut self, status: S, transition: F) -> Result<(), EngineError>
    where
        F: Fn(&State<S, C>, &Scheduler<S, C, I>, I) -> Result<State<S, C>, TransitionError<S, I>>
            + Send
            + Sync
            + 'static,
    {
        if self.running.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        let replaced = Arc::make_mut(&mut self.table).insert(status.clone(), Arc::new(transition));
        if replaced.is_some() {
            tracing::debug!(status = status.name(), "transition.register.replaced");
        }
        Ok(())
    }

    /// Start the loop in `(status, context)` with a fresh input queue.
    ///
    /// Returns the dispatch capability of this run.
    pub fn start(&mut self, status: S, context: C) -> Result<Dispatcher<I>, EngineError> {
        self.start_with_inbox(Inbox::new(), status, context)
    }

    /// Start the loop reading from `inbox`.
    ///
    /// Inputs already in the inbox are applied first, in order.
    pub fn start_with_inbox(
        &mut self,
        inbox: Inbox<I>,
        status: S,
        context: C,
    ) -> Result<Dispatcher<I>, EngineError> {
        if self.running.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let (input_tx, inputs) = inbox.into_parts();
        let (work_tx, work) = queue::work_queue();
        let dispatcher = Dispatcher::new(input_tx);
        let state = State::new(status, context);
        let (published, states) = watch::channel(state.clone());

        notify(&*self.observer, "loop_started", |observer| {
            observer.loop_started(&self.config.name, state.status())
        });
        let run_loop = RunLoop {
            table: Arc::clone(&self.table),
            observer: Arc::clone(&self.observer),
            inputs,
            work,
            scheduler: Scheduler::new(work_tx, NamedTasks::default()),
            dispatcher: dispatcher.clone(),
            state,
            published,
            poll_interval: self.config.poll_interval(),
        };
        let span = tracing::debug_span!("engine", name = %self.config.name);
        let task = CancellableTask::start(&runtime, |token| run_loop.run(token).instrument(span));

        self.running = Some(Running {
            task,
            dispatcher: dispatcher.clone(),
            states,
        });
        Ok(dispatcher)
    }

    /// Stop the loop and wait for every background task.
    ///
    /// In-flight work runs to completion; it is joined, not cancelled.
    /// Inputs still queued when the loop exits are discarded and counted.
    pub async fn stop(&mut self) -> Result<ShutdownReport, EngineError> {
        let Running { task, states, .. } = self.running.take().ok_or(EngineError::NotRunning)?;

        let mut exit = match task.cancel_and_join().await {
            Ok(exit) => exit,
            Err(err) => {
                let message = tasks::join_error_panic_message(err)
                    .unwrap_or_else(|| "engine loop was cancelled".to_string());
                self.last_state = Some(states.borrow().clone());
                let fault = LoopFault::LoopPanicked(message.clone());
                notify(&*self.observer, "loop_fault", |observer| {
                    observer.loop_fault(&fault)
                });
                return Err(EngineError::LoopPanicked(message));
            }
        };

        let mut report = ShutdownReport {
            work_discarded: queue::close_and_discard(&mut exit.work),
            ..ShutdownReport::default()
        };
        exit.inputs.close();

        for (meta, outcome) in exit.tasks.join_all().await {
            report.tasks_joined += 1;
            if !outcome.is_success() {
                report.tasks_failed += 1;
            }
            notify(&*self.observer, "task_finished", |observer| {
                observer.task_finished(&meta, &outcome)
            });
        }
        report.inputs_discarded = queue::close_and_discard(&mut exit.inputs);

        self.last_state = Some(exit.state);
        notify(&*self.observer, "loop_stopped", |observer| {
            observer.loop_stopped(&report)
        });
        Ok(report)
    }

    /// Enqueue `input` for the running loop.
    pub fn dispatch(&self, input: I) -> Result<(), EngineError> {
        self.running
            .as_ref()
            .ok_or(EngineError::NotRunning)?
            .dispatcher
            .dispatch(input)
    }

    /// Dispatch capability of the current run.
    pub fn dispatcher(&self) -> Result<Dispatcher<I>, EngineError> {
        self.running
            .as_ref()
            .map(|running| running.dispatcher.clone())
            .ok_or(EngineError::NotRunning)
    }

    /// Receiver of every state the loop publishes during the current run.
    ///
    /// The receiver keeps the last published state after the run ends.
    pub fn subscribe(&self) -> Result<watch::Receiver<State<S, C>>, EngineError> {
        self.running
            .as_ref()
            .map(|running| running.states.clone())
            .ok_or(EngineError::NotRunning)
    }

    pub fn run_state(&self) -> RunState {
        if self.running.is_some() {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Latest published state while running, final state once stopped,
    /// `None` before the first start.
    pub fn state(&self) -> Option<State<S, C>> {
        match &self.running {
            Some(running) => Some(running.states.borrow().clone()),
            None => self.last_state.clone(),
        }
    }
}

impl<S: Status, C: Context, I: Input> Drop for Engine<S, C, I> {
    fn drop(&mut self) {
        // The loop's cancel guard fires with `running`; its background tasks
        // are detached and finish on their own.
        if self.running.is_some() {
            tracing::warn!(engine = %self.config.name, "engine.dropped_while_running");
        }
    }
}

impl<S: Status, C: Context, I: Input> fmt::Debug for Engine<S, C, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.config.name)
            .field("run_state", &self.run_state())
            .field("table", &self.table)
            .finish()
    }
}
