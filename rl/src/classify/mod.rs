//! Failure classification
//!
//! Producers map provider-specific errors onto a [`FailureSignal`] via the
//! [`Classify`] trait; an [`OverloadPolicy`] decides which signals grow the
//! pacer.

mod error;
mod policy;

pub use error::{ProviderError, RATE_LIMIT_CATEGORY};
pub use policy::{Classify, FailureSignal, OverloadPolicy};
