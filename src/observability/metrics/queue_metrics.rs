//! # Queue Metrics
//!
//! Work queue depth, adds and rate-limited retries, labelled by queue name.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{IntCounterVec, IntGaugeVec};
use std::sync::LazyLock;

static WORKQUEUE_DEPTH: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        prometheus::Opts::new("cvo_workqueue_depth", "Current depth of the work queue"),
        &["name"],
    )
    .expect("Failed to create WORKQUEUE_DEPTH metric - this should never happen")
});

static WORKQUEUE_ADDS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cvo_workqueue_adds_total",
            "Total number of keys marked for processing",
        ),
        &["name"],
    )
    .expect("Failed to create WORKQUEUE_ADDS_TOTAL metric - this should never happen")
});

static WORKQUEUE_RETRIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cvo_workqueue_retries_total",
            "Total number of rate-limited requeues",
        ),
        &["name"],
    )
    .expect("Failed to create WORKQUEUE_RETRIES_TOTAL metric - this should never happen")
});

/// Register queue metrics with the registry
pub(crate) fn register_queue_metrics() -> Result<()> {
    REGISTRY.register(Box::new(WORKQUEUE_DEPTH.clone()))?;
    REGISTRY.register(Box::new(WORKQUEUE_ADDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WORKQUEUE_RETRIES_TOTAL.clone()))?;
    Ok(())
}

pub fn set_workqueue_depth(name: &str, depth: usize) {
    #[allow(clippy::cast_possible_wrap, reason = "Queue depth never approaches i64::MAX")]
    WORKQUEUE_DEPTH.with_label_values(&[name]).set(depth as i64);
}

pub fn increment_workqueue_adds(name: &str) {
    WORKQUEUE_ADDS_TOTAL.with_label_values(&[name]).inc();
}

pub fn increment_workqueue_retries(name: &str) {
    WORKQUEUE_RETRIES_TOTAL.with_label_values(&[name]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_workqueue_depth() {
        set_workqueue_depth("depth-test", 3);
        assert_eq!(WORKQUEUE_DEPTH.with_label_values(&["depth-test"]).get(), 3);
        set_workqueue_depth("depth-test", 0);
        assert_eq!(WORKQUEUE_DEPTH.with_label_values(&["depth-test"]).get(), 0);
    }

    #[test]
    fn test_increment_workqueue_retries() {
        let before = WORKQUEUE_RETRIES_TOTAL.with_label_values(&["retries-test"]).get();
        increment_workqueue_retries("retries-test");
        let after = WORKQUEUE_RETRIES_TOTAL.with_label_values(&["retries-test"]).get();
        assert_eq!(after, before + 1);
    }
}
