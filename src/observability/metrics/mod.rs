//! # Metrics Module
//!
//! Prometheus metrics for monitoring the controller, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text exposition
//! - `controller_metrics` - Sync, retry, degradation and watch event metrics
//! - `queue_metrics` - Work queue depth, adds and retries

pub mod controller_metrics;
pub mod queue_metrics;
pub mod registry;

pub use controller_metrics::*;
pub use queue_metrics::*;
pub use registry::*;
