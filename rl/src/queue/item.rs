//! Work items held by the admission queue

use std::cmp::Ordering;

use futures::future::BoxFuture;
use tokio::time::Instant;

use crate::classify::FailureSignal;
use crate::domain::Priority;

/// How an operation finished, as far as the pacer is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Succeeded,
    Failed(FailureSignal),
    /// The operation panicked; never treated as overload
    Panicked(String),
}

/// Delivers the held result to the submitter
pub(crate) type Settle = Box<dyn FnOnce() + Send>;

/// Type-erased operation: runs the call and hands back its outcome plus a
/// settle callback, so pacer feedback lands before the caller sees the result
pub(crate) type Job = Box<dyn FnOnce() -> BoxFuture<'static, (Outcome, Settle)> + Send>;

/// A pending unit of work
pub(crate) struct WorkItem {
    /// Submission sequence number, also the FIFO tie-breaker
    pub id: u64,
    pub priority: Priority,
    pub submitted_at: Instant,
    pub job: Job,
}

impl WorkItem {
    pub fn new(id: u64, priority: Priority, job: Job) -> Self {
        Self {
            id,
            priority,
            submitted_at: Instant::now(),
            job,
        }
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("submitted_at", &self.submitted_at)
            .finish_non_exhaustive()
    }
}

impl Eq for WorkItem {}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: lower priority value first, then earlier submission
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
