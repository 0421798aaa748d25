//! # Controller
//!
//! The reconciliation engine: watch events are bridged into a single work key on
//! a rate-limited queue, workers run the sync pipeline for it, and failures climb
//! an exponential retry ladder before being reported as Degraded.

pub mod events;
pub mod queue;
pub mod reconciler;
pub mod worker;

pub use events::{EventBridge, WorkSink};
pub use queue::{ExponentialFailureRateLimiter, RateLimiter, WorkQueue};
pub use worker::{Controller, RetryPolicy};

/// Identifier enqueued to trigger reconciliation
pub type WorkKey = String;
