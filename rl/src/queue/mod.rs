//! Admission queue for outbound calls
//!
//! Producers submit operations with a priority; a single drain task runs
//! them one at a time in priority-then-FIFO order, pacing each through the
//! [`AdaptivePacer`](crate::pacer::AdaptivePacer) and feeding outcomes back
//! into it.

mod core;
mod item;
mod messages;
mod ticket;

pub use core::AdmissionQueue;
pub use messages::{QueueEntry, QueueState, QueueStats};
pub use ticket::{QueueError, Ticket};
