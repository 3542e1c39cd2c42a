//! Admission queue messages
//!
//! Commands for the actor and the read-only views it hands back.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::domain::Priority;

use super::item::WorkItem;

/// Commands sent to the queue actor
#[derive(Debug)]
pub(crate) enum QueueCommand {
    Submit(WorkItem),
    State { reply: oneshot::Sender<QueueState> },
    Details { reply: oneshot::Sender<Vec<QueueEntry>> },
}

/// Statistics for the admission queue
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub total_submitted: u64,
    pub total_succeeded: u64,
    pub total_failed: u64,
    /// Failures that were panics, included in `total_failed`
    pub total_panicked: u64,
    pub total_overloads: u64,
    pub total_wait_time_ms: u64,
    pub peak_queue_depth: usize,
}

impl QueueStats {
    pub fn total_settled(&self) -> u64 {
        self.total_succeeded + self.total_failed
    }
}

/// Queue state for display
#[derive(Debug, Clone)]
pub struct QueueState {
    /// Items waiting to be dispatched (excludes the one executing)
    pub pending: usize,
    /// True while the drain loop is working through items
    pub draining: bool,
    pub current_delay: Duration,
    pub stats: QueueStats,
}

/// Pending item for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: u64,
    pub priority: Priority,
    pub waited: Duration,
}
