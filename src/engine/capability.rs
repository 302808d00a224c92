//! The two capabilities handed to user code.
//!
//! - [`Dispatcher`] enqueues inputs. Anyone may hold one: external callers,
//!   background work, other engines.
//! - [`Scheduler`] enqueues background work. Transitions receive it by
//!   reference; work items never do, they only get a `Dispatcher`.
//!
//! Both fail with [`EngineError::NotRunning`] once the engine has stopped.

use crate::core::{Context, Input, State, Status};
use crate::engine::queue::WorkSender;
use crate::engine::EngineError;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Result of one background work item.
pub type WorkResult = anyhow::Result<()>;

pub(crate) type WorkFuture = Pin<Box<dyn Future<Output = WorkResult> + Send>>;

type WorkFn<S, C, I> = Box<dyn FnOnce(State<S, C>, Dispatcher<I>) -> WorkFuture + Send>;

/// One queued unit of background work.
pub(crate) struct WorkItem<S, C, I> {
    pub(crate) claim: Option<NameClaim>,
    pub(crate) run: WorkFn<S, C, I>,
}

impl<S, C, I> WorkItem<S, C, I> {
    pub(crate) fn name(&self) -> Option<&str> {
        self.claim.as_ref().map(NameClaim::name)
    }
}

/// Names of work items that are queued or running.
#[derive(Debug, Clone, Default)]
pub(crate) struct NamedTasks {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl NamedTasks {
    fn claim(&self, name: String) -> Result<NameClaim, EngineError> {
        if !self.in_flight.lock().insert(name.clone()) {
            return Err(EngineError::TaskAlreadyRunning { name });
        }
        Ok(NameClaim {
            name,
            registry: self.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.in_flight.lock().contains(name)
    }
}

/// Reservation of a task name; released on drop.
///
/// The claim travels with the work item into its task, so the name frees up
/// when the task finishes, fails or panics, or when a queued item is dropped
/// without running.
pub(crate) struct NameClaim {
    name: String,
    registry: NamedTasks,
}

impl NameClaim {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NameClaim {
    fn drop(&mut self) {
        self.registry.in_flight.lock().remove(&self.name);
    }
}

/// Capability to enqueue inputs for the engine loop.
pub struct Dispatcher<I> {
    tx: mpsc::UnboundedSender<I>,
}

impl<I: Input> Dispatcher<I> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<I>) -> Self {
        Self { tx }
    }

    /// Enqueue `input`; it is applied after every input dispatched before it.
    pub fn dispatch(&self, input: I) -> Result<(), EngineError> {
        self.tx.send(input).map_err(|_| EngineError::NotRunning)
    }

    /// Whether the engine behind this dispatcher still accepts inputs.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl<I> Clone for Dispatcher<I> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<I> fmt::Debug for Dispatcher<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Capability to enqueue background work, handed to transitions.
///
/// Work does not run immediately: the loop launches it after the current
/// transition returns, with a snapshot of the state at launch time.
pub struct Scheduler<S, C, I> {
    tx: WorkSender<S, C, I>,
    named: NamedTasks,
}

impl<S: Status, C: Context, I: Input> Scheduler<S, C, I> {
    pub(crate) fn new(tx: WorkSender<S, C, I>, named: NamedTasks) -> Self {
        Self { tx, named }
    }

    #[cfg(test)]
    pub(crate) fn detached() -> (Self, crate::engine::queue::WorkReceiver<S, C, I>) {
        let (tx, rx) = crate::engine::queue::work_queue();
        (Self::new(tx, NamedTasks::default()), rx)
    }

    #[cfg(test)]
    pub(crate) fn has_claim(&self, name: &str) -> bool {
        self.named.contains(name)
    }

    /// Enqueue async background work.
    ///
    /// # Example
    ///
    /// ```
    /// use statefold::core::State;
    /// use statefold::engine::Scheduler;
    /// use statefold::transition::TransitionError;
    /// # use statefold::{input_enum, status_enum};
    /// # status_enum! { enum Light { On, Off } }
    /// # input_enum! { enum Command { Toggle, Later } }
    ///
    /// fn on_light(
    ///     state: &State<Light, u32>,
    ///     schedule: &Scheduler<Light, u32, Command>,
    ///     input: Command,
    /// ) -> Result<State<Light, u32>, TransitionError<Light, Command>> {
    ///     match input {
    ///         Command::Later => {
    ///             schedule
    ///                 .schedule(|_snapshot, dispatch| async move {
    ///                     dispatch.dispatch(Command::Toggle)?;
    ///                     Ok(())
    ///                 })
    ///                 .map_err(|err| TransitionError::failed(*state.status(), err.to_string()))?;
    ///             Ok(state.clone())
    ///         }
    ///         Command::Toggle => Ok(state.with_both(Light::Off, state.context() + 1)),
    ///     }
    /// }
    /// ```
    pub fn schedule<F, Fut>(&self, work: F) -> Result<(), EngineError>
    where
        F: FnOnce(State<S, C>, Dispatcher<I>) -> Fut + Send + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        self.send(WorkItem {
            claim: None,
            run: boxed(work),
        })
    }

    /// Enqueue work under `name`.
    ///
    /// Fails with [`EngineError::TaskAlreadyRunning`] while another item with
    /// the same name is queued or running.
    pub fn schedule_named<F, Fut>(&self, name: impl Into<String>, work: F) -> Result<(), EngineError>
    where
        F: FnOnce(State<S, C>, Dispatcher<I>) -> Fut + Send + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        if self.tx.is_closed() {
            return Err(EngineError::NotRunning);
        }
        let claim = self.named.claim(name.into())?;
        self.send(WorkItem {
            claim: Some(claim),
            run: boxed(work),
        })
    }

    /// Enqueue synchronous work, run on the blocking thread pool.
    pub fn schedule_blocking<F>(&self, work: F) -> Result<(), EngineError>
    where
        F: FnOnce(State<S, C>, Dispatcher<I>) -> WorkResult + Send + 'static,
    {
        self.schedule(move |state, dispatcher| async move {
            match tokio::task::spawn_blocking(move || work(state, dispatcher)).await {
                Ok(result) => result,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => Err(err.into()),
            }
        })
    }

    /// Whether the engine behind this scheduler still accepts work.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, item: WorkItem<S, C, I>) -> Result<(), EngineError> {
        self.tx.send(item).map_err(|_| EngineError::NotRunning)
    }
}

fn boxed<S, C, I, F, Fut>(work: F) -> WorkFn<S, C, I>
where
    F: FnOnce(State<S, C>, Dispatcher<I>) -> Fut + Send + 'static,
    Fut: Future<Output = WorkResult> + Send + 'static,
{
    Box::new(move |state, dispatcher| Box::pin(work(state, dispatcher)))
}

impl<S, C, I> Clone for Scheduler<S, C, I> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            named: self.named.clone(),
        }
    }
}

impl<S, C, I> fmt::Debug for Scheduler<S, C, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}
