//! Cancellation for in-flight client operations.
//!
//! Dropping an operation's future aborts its request, which is how
//! [`run_cancellable`] stops it. [`block_on_cancellable`] serves synchronous
//! callers: it blocks the calling thread until the operation finishes or the
//! token fires, and reports the latter as [`ClientError::Cancelled`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{ClientError, Result};

/// Clonable cancellation flag. All clones observe the same state.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once cancelled.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Races `operation` against `token`. Works with any error type that can carry
/// [`ClientError::Cancelled`].
pub async fn run_cancellable<T, E, F>(operation: F, token: &CancelToken) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<ClientError>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ClientError::Cancelled.into()),
        result = operation => result,
    }
}

/// Runs `operation` to completion on a private runtime, blocking this thread.
///
/// Fails with [`ClientError::NestedRuntime`] when called from inside an async
/// runtime, where blocking the thread would stall the executor.
pub fn block_on_cancellable<T, F>(operation: F, token: &CancelToken) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if token.is_cancelled() {
        return Err(ClientError::Cancelled);
    }
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(ClientError::NestedRuntime);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_cancellable(operation, token))
}
