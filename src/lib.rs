//! # Cluster Version Controller
//!
//! A Kubernetes controller that drives the cluster toward a single desired
//! configuration object (`CVOConfig`).
//!
//! ## Overview
//!
//! Every watched notification collapses into one fixed work key on a leveled,
//! rate-limited work queue. Workers pull that key and run the sync pipeline:
//!
//! 1. **Ensure definitions** - server-side apply the controller's CRDs
//! 2. **Resolve config** - compute, validate and apply-if-changed the desired `CVOConfig`
//! 3. **Publish Working** - report progress through the status sink
//! 4. **Fetch payload** - read the update payload for the config's channel
//! 5. **Apply payload** - server-side apply every manifest in the payload
//! 6. **Publish Done** - report completion
//!
//! Failures are retried with exponential backoff (5ms doubling per attempt) and,
//! once the retry budget is spent, reported as a `Degraded` condition before the
//! key is dropped until the next external trigger.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod provider;
pub mod runtime;

// Re-export CRD types for convenience
pub use crd::*;
