//! Engine event hooks.
//!
//! The engine reports everything it does through an [`EngineObserver`] held
//! as `Arc<dyn EngineObserver>`. Every hook has a default body that emits a
//! structured `tracing` event, so an observer only overrides what it needs.
//! Overriding a hook replaces its log line; call the matching `log_*`
//! function to keep it.
//!
//! A panicking hook never takes the engine down: the panic is contained and
//! reported as [`LoopFault::ObserverPanicked`].

use crate::core::{Input, Status};
use crate::engine::{panic_message, ShutdownReport, TaskMeta, TaskOutcome};
use crate::transition::TransitionError;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Failure on the loop task itself, as opposed to a background task.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopFault {
    /// A transition panicked. The input was dropped and the state kept its
    /// previous value.
    #[error("Transition from status \"{status}\" panicked on input of kind \"{input_kind}\": {message}")]
    TransitionPanicked {
        status: String,
        input_kind: String,
        message: String,
    },

    /// The loop task died; the engine was stopped with its last published
    /// state.
    #[error("Engine loop panicked: {0}")]
    LoopPanicked(String),

    /// An observer hook panicked. The event it was reporting still took
    /// effect.
    #[error("Observer hook \"{hook}\" panicked: {message}")]
    ObserverPanicked { hook: String, message: String },
}

/// Receives engine events.
///
/// Hooks run on the loop task, or inside `start` and `stop` for the lifecycle
/// events. They must not block.
pub trait EngineObserver<S: Status, I: Input>: Send + Sync + 'static {
    fn loop_started(&self, name: &str, status: &S) {
        tracing::info!(engine = name, status = status.name(), "engine.started");
    }

    fn input_received(&self, input: &I) {
        tracing::trace!(kind = input.kind(), "engine.input");
    }

    fn transition_applied(&self, from: &S, to: &S, input_kind: &'static str) {
        tracing::debug!(
            from = from.name(),
            to = to.name(),
            input = input_kind,
            "engine.transition"
        );
    }

    fn transition_rejected(&self, error: &TransitionError<S, I>) {
        log_rejected(error);
    }

    fn loop_fault(&self, fault: &LoopFault) {
        log_fault(fault);
    }

    fn task_launched(&self, task: &TaskMeta) {
        tracing::trace!(task = %task.id, name = task.name.as_deref(), "engine.task.launch");
    }

    fn task_finished(&self, task: &TaskMeta, outcome: &TaskOutcome) {
        log_task_finished(task, outcome);
    }

    fn loop_stopped(&self, report: &ShutdownReport) {
        tracing::info!(
            tasks_joined = report.tasks_joined,
            tasks_failed = report.tasks_failed,
            inputs_discarded = report.inputs_discarded,
            work_discarded = report.work_discarded,
            "engine.stopped"
        );
    }
}

/// Observer that only logs. The default for every engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl<S: Status, I: Input> EngineObserver<S, I> for TracingObserver {}

/// Call one hook of `observer`, containing any panic it raises.
///
/// The panic is reported through `loop_fault`; if that hook panics as well
/// the fault is only logged.
pub(crate) fn notify<S, I, F>(observer: &dyn EngineObserver<S, I>, hook: &'static str, call: F)
where
    S: Status,
    I: Input,
    F: FnOnce(&dyn EngineObserver<S, I>),
{
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| call(observer))) {
        let fault = LoopFault::ObserverPanicked {
            hook: hook.to_string(),
            message: panic_message(&*payload),
        };
        if panic::catch_unwind(AssertUnwindSafe(|| observer.loop_fault(&fault))).is_err() {
            log_fault(&fault);
        }
    }
}

/// Default body of [`EngineObserver::loop_fault`].
pub fn log_fault(fault: &LoopFault) {
    tracing::error!(%fault, "engine.fault");
}

/// Default body of [`EngineObserver::transition_rejected`].
pub fn log_rejected<S: Status, I: Input>(error: &TransitionError<S, I>) {
    tracing::warn!(status = error.status().name(), %error, "engine.rejected");
}

/// Default body of [`EngineObserver::task_finished`].
pub fn log_task_finished(task: &TaskMeta, outcome: &TaskOutcome) {
    let name = task.name.as_deref();
    match outcome {
        TaskOutcome::Completed => {
            tracing::debug!(task = %task.id, name, "engine.task.finish");
        }
        TaskOutcome::Failed(error) => {
            tracing::error!(task = %task.id, name, %error, "engine.task.finish");
        }
        TaskOutcome::Panicked(message) => {
            tracing::error!(task = %task.id, name, panic = %message, "engine.task.finish");
        }
        TaskOutcome::Cancelled => {
            tracing::warn!(task = %task.id, name, "engine.task.finish");
        }
    }
}
