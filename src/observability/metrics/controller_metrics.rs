//! # Controller Metrics
//!
//! Metrics for sync runs, retries, degradations and watch events.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::LazyLock;

// Sync pipeline metrics
static SYNCS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("cvo_syncs_total", "Total number of sync pipeline runs")
        .expect("Failed to create SYNCS_TOTAL metric - this should never happen")
});

static SYNC_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cvo_sync_errors_total",
            "Total number of failed sync pipeline runs",
        ),
        &["kind"],
    )
    .expect("Failed to create SYNC_ERRORS_TOTAL metric - this should never happen")
});

static SYNC_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cvo_sync_duration_seconds",
            "Duration of sync pipeline runs in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
    )
    .expect("Failed to create SYNC_DURATION metric - this should never happen")
});

static PAYLOAD_FETCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cvo_payload_fetch_duration_seconds",
            "Duration of update payload reads in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
    )
    .expect("Failed to create PAYLOAD_FETCH_DURATION metric - this should never happen")
});

static MANIFESTS_APPLIED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cvo_manifests_applied_total",
        "Total number of update payload manifests applied",
    )
    .expect("Failed to create MANIFESTS_APPLIED_TOTAL metric - this should never happen")
});

// Retry ladder metrics
static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("cvo_requeues_total", "Total number of work key requeues"),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static DEGRADED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cvo_degraded_total",
        "Total number of times the retry budget was exhausted",
    )
    .expect("Failed to create DEGRADED_TOTAL metric - this should never happen")
});

// Watch event metrics
static EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("cvo_events_total", "Total number of watch notifications"),
        &["resource", "kind"],
    )
    .expect("Failed to create EVENTS_TOTAL metric - this should never happen")
});

/// Register controller metrics with the registry
pub(crate) fn register_controller_metrics() -> Result<()> {
    REGISTRY.register(Box::new(SYNCS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_DURATION.clone()))?;
    REGISTRY.register(Box::new(PAYLOAD_FETCH_DURATION.clone()))?;
    REGISTRY.register(Box::new(MANIFESTS_APPLIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEGRADED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EVENTS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_syncs() {
    SYNCS_TOTAL.inc();
}

pub fn increment_sync_errors(kind: &str) {
    SYNC_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_sync_duration(duration: f64) {
    SYNC_DURATION.observe(duration);
}

pub fn observe_payload_fetch_duration(duration: f64) {
    PAYLOAD_FETCH_DURATION.observe(duration);
}

pub fn increment_manifests_applied(count: usize) {
    MANIFESTS_APPLIED_TOTAL.inc_by(count as u64);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_degraded() {
    DEGRADED_TOTAL.inc();
}

pub fn increment_events(resource: &str, kind: &str) {
    EVENTS_TOTAL.with_label_values(&[resource, kind]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_syncs() {
        let before = SYNCS_TOTAL.get();
        increment_syncs();
        assert!(SYNCS_TOTAL.get() > before);
    }

    #[test]
    fn test_increment_sync_errors_by_kind() {
        let before = SYNC_ERRORS_TOTAL.with_label_values(&["metrics-test"]).get();
        increment_sync_errors("metrics-test");
        let after = SYNC_ERRORS_TOTAL.with_label_values(&["metrics-test"]).get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_increment_manifests_applied() {
        let before = MANIFESTS_APPLIED_TOTAL.get();
        increment_manifests_applied(3);
        assert!(MANIFESTS_APPLIED_TOTAL.get() >= before + 3);
    }

    #[test]
    fn test_increment_events_labels() {
        let before = EVENTS_TOTAL.with_label_values(&["MetricsTest", "add"]).get();
        increment_events("MetricsTest", "add");
        let after = EVENTS_TOTAL.with_label_values(&["MetricsTest", "add"]).get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_observe_sync_duration() {
        observe_sync_duration(0.25);
        // Just verify it doesn't panic - histogram observation doesn't return a value
    }
}
