//! Adaptive pacing between outbound calls
//!
//! Holds the single piece of feedback state, the inter-request delay, which
//! grows quickly on overload and decays slowly once things have been quiet.

mod config;
mod core;

pub use config::PacerConfig;
pub use core::{AdaptivePacer, PacerSnapshot};
