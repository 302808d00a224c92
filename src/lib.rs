//! Statefold: a single-writer actor engine.
//!
//! An actor is a `(status, context)` pair that changes only when an input is
//! applied to it. Statefold keeps that rule under concurrency: one loop task
//! applies inputs strictly in arrival order, while any side work a transition
//! wants done runs as background tasks that can only talk back by
//! dispatching new inputs.
//!
//! # Core Concepts
//!
//! - **State**: the immutable `(status, context)` pair, see [`core::State`]
//! - **Transitions**: one function per status in a [`TransitionTable`], or a
//!   kinded table keyed by `(status, input kind)`
//! - **Capabilities**: [`Dispatcher`] enqueues inputs from anywhere;
//!   [`Scheduler`] enqueues background work and is only handed to transitions
//! - **Engine**: the lifecycle controller; `stop` joins every background task
//! - **Machine**: the synchronous variant, with a status history
//!
//! # Example
//!
//! ```rust
//! use statefold::{input_enum, status_enum, Engine};
//!
//! status_enum! {
//!     enum Job {
//!         Idle,
//!         Busy,
//!     }
//! }
//!
//! input_enum! {
//!     enum Event {
//!         Begin,
//!         Finished,
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut engine = Engine::<Job, u32, Event>::builder()
//!     .register(Job::Idle, |state, schedule, _| {
//!         schedule
//!             .schedule(|snapshot, dispatch| async move {
//!                 assert_eq!(snapshot.status(), &Job::Busy);
//!                 dispatch.dispatch(Event::Finished)?;
//!                 Ok(())
//!             })
//!             .map_err(|err| statefold::TransitionError::failed(Job::Idle, err.to_string()))?;
//!         Ok(state.with_status(Job::Busy))
//!     })
//!     .register(Job::Busy, |state, _, _| {
//!         Ok(state.with_both(Job::Idle, state.context() + 1))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let jobs = engine.start(Job::Idle, 0).unwrap();
//! let mut states = engine.subscribe().unwrap();
//! jobs.dispatch(Event::Begin).unwrap();
//! states.wait_for(|state| *state.context() == 1).await.unwrap();
//!
//! engine.stop().await.unwrap();
//! assert_eq!(engine.state().unwrap().status(), &Job::Idle);
//! # }
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod machine;
pub mod observe;
pub mod transition;

// Re-export commonly used types
pub use builder::{BuildError, EngineBuilder, KindedTableBuilder, TransitionTableBuilder};
pub use core::{Context, Input, State, Status, StatusChange, StatusHistory};
pub use engine::{
    Dispatcher, Engine, EngineConfig, EngineError, Inbox, RunState, Scheduler, ShutdownReport,
    TaskId, TaskMeta, TaskOutcome, WorkResult,
};
pub use machine::Machine;
pub use observe::{EngineObserver, LoopFault, TracingObserver};
pub use transition::{KindedTable, TransitionError, TransitionFn, TransitionTable};
