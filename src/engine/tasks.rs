//! Background task bookkeeping.
//!
//! Every launched work item lives in one `JoinSet` until it is reaped. The
//! loop reaps finished tasks between inputs; `stop` joins whatever is left.
//! Failures and panics become [`TaskOutcome`]s and are reported, never
//! re-raised.

use crate::core::{Context, Input, State, Status};
use crate::engine::capability::{Dispatcher, WorkItem, WorkResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::Instrument;

/// Sequence number of a launched work item, unique per engine run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// What the engine knows about a launched work item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMeta {
    pub id: TaskId,
    pub name: Option<String>,
}

/// How a work item ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Completed,
    /// The work returned an error; holds the full error chain.
    Failed(String),
    /// The work panicked; holds the panic message.
    Panicked(String),
    /// The task was aborted before it finished.
    Cancelled,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// In-flight background tasks of one engine run.
#[derive(Debug, Default)]
pub(crate) struct TaskSet {
    running: JoinSet<WorkResult>,
    meta: HashMap<Id, TaskMeta>,
    next_id: u64,
}

impl TaskSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.running.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Spawn `item` on the current runtime with `snapshot` as its state.
    ///
    /// The work closure itself runs inside the task, so a panic before it
    /// yields its future is a task panic like any other. The item's name
    /// claim moves into the task and is released when the task ends,
    /// however it ends.
    pub(crate) fn launch<S, C, I>(
        &mut self,
        item: WorkItem<S, C, I>,
        snapshot: State<S, C>,
        dispatcher: Dispatcher<I>,
    ) -> TaskMeta
    where
        S: Status,
        C: Context,
        I: Input,
    {
        self.next_id += 1;
        let meta = TaskMeta {
            id: TaskId(self.next_id),
            name: item.name().map(str::to_owned),
        };
        let span = tracing::debug_span!("engine.task", id = meta.id.0, name = meta.name.as_deref());

        let WorkItem { claim, run } = item;
        let handle = self.running.spawn(
            async move {
                let _claim = claim;
                run(snapshot, dispatcher).await
            }
            .instrument(span),
        );
        self.meta.insert(handle.id(), meta.clone());
        meta
    }

    /// Collect tasks that already finished, without waiting.
    pub(crate) fn reap(&mut self) -> Vec<(TaskMeta, TaskOutcome)> {
        let mut finished = Vec::new();
        while let Some(joined) = self.running.try_join_next_with_id() {
            finished.extend(self.settle(joined));
        }
        finished
    }

    /// Wait for every remaining task.
    pub(crate) async fn join_all(&mut self) -> Vec<(TaskMeta, TaskOutcome)> {
        let mut finished = Vec::with_capacity(self.running.len());
        while let Some(joined) = self.running.join_next_with_id().await {
            finished.extend(self.settle(joined));
        }
        finished
    }

    fn settle(
        &mut self,
        joined: Result<(Id, WorkResult), JoinError>,
    ) -> Option<(TaskMeta, TaskOutcome)> {
        let (id, outcome) = match joined {
            Ok((id, Ok(()))) => (id, TaskOutcome::Completed),
            Ok((id, Err(err))) => (id, TaskOutcome::Failed(format!("{err:#}"))),
            Err(err) => (err.id(), join_error_outcome(err)),
        };
        self.meta.remove(&id).map(|meta| (meta, outcome))
    }
}

/// Tasks still running when the set is dropped unjoined (the engine was
/// dropped while running, or the loop died) are detached, not aborted.
impl Drop for TaskSet {
    fn drop(&mut self) {
        if !self.running.is_empty() {
            tracing::warn!(abandoned = self.running.len(), "engine.tasks.detached");
            self.running.detach_all();
        }
    }
}

fn join_error_outcome(err: JoinError) -> TaskOutcome {
    if err.is_panic() {
        TaskOutcome::Panicked(panic_message(&*err.into_panic()))
    } else {
        TaskOutcome::Cancelled
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Panic message carried by `err`, or `None` when the task was cancelled.
pub(crate) fn join_error_panic_message(err: JoinError) -> Option<String> {
    match join_error_outcome(err) {
        TaskOutcome::Panicked(message) => Some(message),
        _ => None,
    }
}
