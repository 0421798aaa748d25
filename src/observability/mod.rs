//! # Observability
//!
//! Prometheus metrics for the controller. Logging is plain `tracing`, set up in
//! `runtime::initialization`.

pub mod metrics;
