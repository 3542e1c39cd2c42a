//! Submission handles and queue errors

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

/// Errors delivered through a [`Ticket`]
#[derive(Debug, Error)]
pub enum QueueError<E> {
    /// The operation ran and failed; the error is passed through untouched
    #[error("{0}")]
    Operation(E),

    /// The queue actor is gone, nothing was enqueued
    #[error("Admission queue closed")]
    Closed,

    /// The operation panicked while executing; the queue kept running
    #[error("Work item {id} panicked: {message}")]
    Panicked { id: u64, message: String },

    /// The item was dropped without being settled
    #[error("Work item {id} abandoned before settling")]
    Abandoned { id: u64 },
}

impl<E> QueueError<E> {
    /// The operation's own error, if that is what this is
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }

    pub fn operation(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }
}

/// Handle to a submitted operation, resolves exactly once with its outcome
///
/// Dropping a ticket does not withdraw the item; it still runs and its
/// result is discarded.
#[derive(Debug)]
pub struct Ticket<T, E> {
    id: u64,
    rx: oneshot::Receiver<Result<T, QueueError<E>>>,
}

impl<T, E> Ticket<T, E> {
    pub(crate) fn new(id: u64, rx: oneshot::Receiver<Result<T, QueueError<E>>>) -> Self {
        Self { id, rx }
    }

    /// Submission sequence number of the item behind this ticket
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T, E> Future for Ticket<T, E> {
    type Output = Result<T, QueueError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(QueueError::Abandoned { id })),
            Poll::Pending => Poll::Pending,
        }
    }
}
