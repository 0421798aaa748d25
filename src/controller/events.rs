//! # Event Bridge
//!
//! Turns add/update/delete notifications into enqueues of the one work key.
//!
//! The bridge is level-triggered: it never looks at what changed, it only signals
//! that the desired state should be rechecked. The sync pipeline re-derives
//! everything from the cluster on each run.

use crate::controller::queue::WorkQueue;
use crate::controller::WorkKey;
use crate::observability;
use kube::Resource;
use std::sync::Arc;
use tracing::trace;

/// Destination for enqueued work keys
pub trait WorkSink: Send + Sync {
    fn enqueue(&self, key: WorkKey);
}

impl WorkSink for WorkQueue<WorkKey> {
    fn enqueue(&self, key: WorkKey) {
        self.add(key);
    }
}

/// Forwards every notification as an enqueue of a fixed key
#[derive(Clone)]
pub struct EventBridge {
    sink: Arc<dyn WorkSink>,
    key: WorkKey,
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl EventBridge {
    pub fn new(sink: Arc<dyn WorkSink>, key: impl Into<WorkKey>) -> Self {
        Self {
            sink,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn on_add<K>(&self, _object: &K)
    where
        K: Resource<DynamicType = ()>,
    {
        self.trigger(&K::kind(&()), "add");
    }

    /// Enqueues even when `old` and `new` are identical
    pub fn on_update<K>(&self, _old: Option<&K>, _new: &K)
    where
        K: Resource<DynamicType = ()>,
    {
        self.trigger(&K::kind(&()), "update");
    }

    pub fn on_delete<K>(&self, _object: &K)
    where
        K: Resource<DynamicType = ()>,
    {
        self.trigger(&K::kind(&()), "delete");
    }

    fn trigger(&self, resource: &str, kind: &str) {
        trace!("{} {} event, enqueueing {}", resource, kind, self.key);
        observability::metrics::increment_events(resource, kind);
        self.sink.enqueue(self.key.clone());
    }
}
