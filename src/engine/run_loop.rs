//! The single-writer engine loop.
//!
//! Each iteration waits up to one poll interval for an input, applies at most
//! one, then launches every queued work item and reaps finished tasks. The
//! loop is the only code that ever replaces the engine state.

use crate::core::{Context, Input, State, Status};
use crate::engine::capability::{Dispatcher, Scheduler};
use crate::engine::queue::WorkReceiver;
use crate::engine::tasks::{panic_message, TaskSet};
use crate::observe::{notify, EngineObserver, LoopFault};
use crate::transition::TransitionTable;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

pub(crate) struct RunLoop<S: Status, C: Context, I: Input> {
    pub(crate) table: Arc<TransitionTable<S, C, I>>,
    pub(crate) observer: Arc<dyn EngineObserver<S, I>>,
    pub(crate) inputs: mpsc::UnboundedReceiver<I>,
    pub(crate) work: WorkReceiver<S, C, I>,
    pub(crate) scheduler: Scheduler<S, C, I>,
    pub(crate) dispatcher: Dispatcher<I>,
    pub(crate) state: State<S, C>,
    pub(crate) published: watch::Sender<State<S, C>>,
    pub(crate) poll_interval: Duration,
}

/// Everything the loop owned, handed back to `stop` for teardown.
pub(crate) struct LoopExit<S, C, I> {
    pub(crate) state: State<S, C>,
    pub(crate) inputs: mpsc::UnboundedReceiver<I>,
    pub(crate) work: WorkReceiver<S, C, I>,
    pub(crate) tasks: TaskSet,
}

impl<S: Status, C: Context, I: Input> RunLoop<S, C, I> {
    pub(crate) async fn run(mut self, token: CancellationToken) -> LoopExit<S, C, I> {
        let mut tasks = TaskSet::new();

        loop {
            let received = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                received = tokio::time::timeout(self.poll_interval, self.inputs.recv()) => received,
            };

            match received {
                Ok(Some(input)) => self.step(input),
                Ok(None) => {
                    // The loop holds a dispatcher of its own, so the inbox
                    // cannot close under it. Polling a closed inbox would
                    // spin, so leave as if cancelled.
                    tracing::error!("engine.inbox_closed");
                    break;
                }
                Err(_elapsed) => {}
            }
            self.launch_work(&mut tasks);
            for (meta, outcome) in tasks.reap() {
                notify(&*self.observer, "task_finished", |observer| {
                    observer.task_finished(&meta, &outcome)
                });
            }
        }

        // Work scheduled by the last transition must still run.
        self.launch_work(&mut tasks);
        tracing::debug!(pending = tasks.len(), "engine.cancelled");

        LoopExit {
            state: self.state,
            inputs: self.inputs,
            work: self.work,
            tasks,
        }
    }

    fn step(&mut self, input: I) {
        notify(&*self.observer, "input_received", |observer| {
            observer.input_received(&input)
        });
        let kind = input.kind();

        let applied = panic::catch_unwind(AssertUnwindSafe(|| {
            self.table.apply(&self.state, &self.scheduler, input)
        }));

        match applied {
            Ok(Ok(next)) => {
                let previous = std::mem::replace(&mut self.state, next);
                self.published.send_replace(self.state.clone());
                notify(&*self.observer, "transition_applied", |observer| {
                    observer.transition_applied(previous.status(), self.state.status(), kind)
                });
            }
            Ok(Err(rejected)) => notify(&*self.observer, "transition_rejected", |observer| {
                observer.transition_rejected(&rejected)
            }),
            Err(payload) => {
                let fault = LoopFault::TransitionPanicked {
                    status: self.state.status().name().to_string(),
                    input_kind: kind.to_string(),
                    message: panic_message(&*payload),
                };
                notify(&*self.observer, "loop_fault", |observer| {
                    observer.loop_fault(&fault)
                });
            }
        }
    }

    /// Launch every queued work item with a snapshot of the current state.
    fn launch_work(&mut self, tasks: &mut TaskSet) {
        while let Ok(item) = self.work.try_recv() {
            let meta = tasks.launch(item, self.state.clone(), self.dispatcher.clone());
            notify(&*self.observer, "task_launched", |observer| {
                observer.task_launched(&meta)
            });
        }
    }
}
