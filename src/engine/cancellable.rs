//! A spawned task paired with the token that asks it to stop.

use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Handle to a cooperatively cancellable task.
///
/// The body receives a child of the task token and is expected to return
/// soon after it is cancelled. Dropping the handle cancels the token but does
/// not wait for the task.
#[derive(Debug)]
pub(crate) struct CancellableTask<T> {
    token: CancellationToken,
    handle: JoinHandle<T>,
    _guard: DropGuard,
}

impl<T: Send + 'static> CancellableTask<T> {
    pub(crate) fn start<F, Fut>(runtime: &Handle, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = runtime.spawn(body(token.child_token()));
        Self {
            _guard: token.clone().drop_guard(),
            token,
            handle,
        }
    }

    /// Request cancellation and wait for the task to return.
    pub(crate) async fn cancel_and_join(self) -> Result<T, JoinError> {
        self.token.cancel();
        self.handle.await
    }
}
