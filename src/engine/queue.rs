//! The two engine queues.
//!
//! Both are unbounded tokio mpsc channels: any number of producers, one
//! consumer (the engine loop). Closing the receiving side is how the engine
//! turns late `dispatch`/`schedule` calls into `NotRunning` errors.

use crate::core::Input;
use crate::engine::capability::{Dispatcher, WorkItem};
use tokio::sync::mpsc;

pub(crate) type WorkSender<S, C, I> = mpsc::UnboundedSender<WorkItem<S, C, I>>;
pub(crate) type WorkReceiver<S, C, I> = mpsc::UnboundedReceiver<WorkItem<S, C, I>>;

/// Input queue created ahead of [`Engine::start_with_inbox`].
///
/// Inputs dispatched into an inbox before the engine starts are kept and
/// processed in order once it does.
///
/// [`Engine::start_with_inbox`]: crate::engine::Engine::start_with_inbox
#[derive(Debug)]
pub struct Inbox<I> {
    tx: mpsc::UnboundedSender<I>,
    rx: mpsc::UnboundedReceiver<I>,
}

impl<I: Input> Inbox<I> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Dispatch capability feeding this inbox.
    pub fn dispatcher(&self) -> Dispatcher<I> {
        Dispatcher::new(self.tx.clone())
    }

    pub(crate) fn into_parts(self) -> (mpsc::UnboundedSender<I>, mpsc::UnboundedReceiver<I>) {
        (self.tx, self.rx)
    }
}

impl<I: Input> Default for Inbox<I> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn work_queue<S, C, I>() -> (WorkSender<S, C, I>, WorkReceiver<S, C, I>) {
    mpsc::unbounded_channel()
}

/// Close `rx` and drop everything still buffered, returning how many
/// items were dropped.
pub(crate) fn close_and_discard<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> usize {
    rx.close();
    let mut discarded = 0;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    discarded
}
