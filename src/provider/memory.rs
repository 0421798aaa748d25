//! # In-Memory Providers
//!
//! Config store and status sink kept in process memory.

use crate::controller::reconciler::{
    ConditionKind, ConfigRef, DesiredConfig, StatusCondition, SyncError,
};
use crate::provider::{ApplyOutcome, ConfigStore, StatusSink};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Config store backed by a map, counting writes
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    objects: Mutex<HashMap<ConfigRef, DesiredConfig>>,
    writes: Mutex<usize>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<ConfigRef, DesiredConfig>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, target: &ConfigRef) -> Option<DesiredConfig> {
        self.objects().get(target).cloned()
    }

    /// Number of create/update writes issued so far
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn apply_if_changed(&self, candidate: &DesiredConfig) -> Result<ApplyOutcome, SyncError> {
        let mut objects = self.objects();
        let target = candidate.config_ref();
        if objects.get(&target) == Some(candidate) {
            return Ok(ApplyOutcome {
                actual: candidate.clone(),
                changed: false,
            });
        }

        objects.insert(target, candidate.clone());
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(ApplyOutcome {
            actual: candidate.clone(),
            changed: true,
        })
    }
}

/// Status sink remembering every published condition in order
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    published: Mutex<Vec<(ConfigRef, StatusCondition)>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn published(&self) -> MutexGuard<'_, Vec<(ConfigRef, StatusCondition)>> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every condition published so far, oldest first
    pub fn conditions(&self) -> Vec<StatusCondition> {
        self.published().iter().map(|(_, c)| c.clone()).collect()
    }

    /// Current (last written) condition for a target
    pub fn latest(&self, target: &ConfigRef) -> Option<StatusCondition> {
        self.published()
            .iter()
            .rev()
            .find(|(t, _)| t == target)
            .map(|(_, c)| c.clone())
    }

    pub fn count(&self, kind: ConditionKind) -> usize {
        self.published()
            .iter()
            .filter(|(_, c)| c.kind == kind)
            .count()
    }
}

#[async_trait]
impl StatusSink for RecordingStatusSink {
    async fn publish_condition(
        &self,
        target: &ConfigRef,
        condition: &StatusCondition,
    ) -> Result<(), SyncError> {
        self.published()
            .push((target.clone(), condition.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config(channel: &str) -> DesiredConfig {
        DesiredConfig {
            namespace: "ns".to_string(),
            name: "version".to_string(),
            upstream: "http://localhost:8080/graph".to_string(),
            channel: channel.to_string(),
            cluster_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_apply_if_changed_is_idempotent() {
        let store = InMemoryConfigStore::new();
        let candidate = config("fast");

        let first = store.apply_if_changed(&candidate).await.unwrap();
        let second = store.apply_if_changed(&candidate).await.unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(second.actual, candidate);
        assert_eq!(store.get(&candidate.config_ref()), Some(candidate));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_apply_if_changed_updates_differing_config() {
        let store = InMemoryConfigStore::new();
        store.apply_if_changed(&config("fast")).await.unwrap();

        let updated = config("stable");
        let outcome = store.apply_if_changed(&updated).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(store.get(&updated.config_ref()), Some(updated));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_recording_sink_last_write_wins() {
        let sink = RecordingStatusSink::new();
        let target = ConfigRef::new("ns", "version");
        let config = config("fast");

        sink.publish_condition(&target, &StatusCondition::working(&config))
            .await
            .unwrap();
        sink.publish_condition(&target, &StatusCondition::done(&config))
            .await
            .unwrap();

        assert_eq!(sink.latest(&target), Some(StatusCondition::done(&config)));
        assert_eq!(sink.count(ConditionKind::Working), 1);
        assert_eq!(sink.conditions().len(), 2);
    }
}
