//! One-shot completion handles for submitted work.

use std::task::Poll;

use tokio::sync::oneshot::{self, error::TryRecvError};

/// Receives the result of one submitted task.
///
/// Every accessor yields `None` only when the task was lost before
/// finishing (its worker panicked or the pool shut down). Dropping a
/// ticket simply discards the result when it arrives.
#[derive(Debug)]
pub struct Ticket<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Ticket<T> {
    pub(crate) fn new(rx: oneshot::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Non-blocking check, for consumers that poll from an event loop.
    ///
    /// `Poll::Pending` while the task runs; `Poll::Ready` once, after which
    /// further calls report `Ready(None)`.
    pub fn try_take(&mut self) -> Poll<Option<T>> {
        match self.rx.try_recv() {
            Ok(value) => Poll::Ready(Some(value)),
            Err(TryRecvError::Empty) => Poll::Pending,
            Err(TryRecvError::Closed) => Poll::Ready(None),
        }
    }

    /// Block the current thread until the task completes.
    ///
    /// Must not be called from inside an async runtime; use [`Ticket::recv`].
    pub fn wait(self) -> Option<T> {
        self.rx.blocking_recv().ok()
    }

    /// Await the task's result.
    pub async fn recv(self) -> Option<T> {
        self.rx.await.ok()
    }
}
