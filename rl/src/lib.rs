//! Ratelane - adaptive pacing and priority admission for rate-limited APIs
//!
//! Every outbound call to a rate-limited provider goes through an
//! [`AdmissionQueue`]. The queue runs one call at a time, most urgent first,
//! and waits an adaptive delay before each one. The delay doubles whenever the
//! provider answers with a rate-limit signal and relaxes slowly once the
//! provider has been quiet for a while.
//!
//! # Modules
//!
//! - [`pacer`] - The adaptive inter-request delay
//! - [`queue`] - Priority admission queue and its drain loop
//! - [`classify`] - Typed provider failures and overload classification
//! - [`lanes`] - One independently tuned queue per provider
//! - [`retry`] - Bounded retry through the queue
//! - [`config`] - Configuration types and loading
//! - [`simulate`] - Scripted fake provider
//! - [`cli`] - Command-line interface

pub mod classify;
pub mod cli;
pub mod config;
pub mod domain;
pub mod lanes;
pub mod pacer;
pub mod queue;
pub mod retry;
pub mod simulate;

// Re-export commonly used types
pub use classify::{Classify, FailureSignal, OverloadPolicy, ProviderError};
pub use config::{Config, ProviderConfig};
pub use domain::Priority;
pub use lanes::ProviderLanes;
pub use pacer::{AdaptivePacer, PacerConfig, PacerSnapshot};
pub use queue::{AdmissionQueue, QueueEntry, QueueError, QueueState, QueueStats, Ticket};
pub use retry::RetryPolicy;
pub use simulate::{Provider, SimulatedProvider};
