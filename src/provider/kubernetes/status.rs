//! # OperatorStatus Sink
//!
//! Publishes conditions by server-side applying the OperatorStatus object that
//! shares the CVOConfig's namespace and name. Each publish replaces the previous
//! condition.

use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::{ConfigRef, Stage, StatusCondition, SyncError};
use crate::crd::{OperatorStatus, OperatorStatusCondition, OperatorStatusSpec};
use crate::provider::StatusSink;
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::debug;

/// Status sink writing OperatorStatus objects
#[derive(Clone)]
pub struct KubeStatusSink {
    client: Client,
    version: String,
}

impl std::fmt::Debug for KubeStatusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStatusSink")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl KubeStatusSink {
    pub fn new(client: Client, version: impl Into<String>) -> Self {
        Self {
            client,
            version: version.into(),
        }
    }
}

/// OperatorStatus object carrying a condition
pub fn operator_status_for(
    target: &ConfigRef,
    condition: &StatusCondition,
    version: &str,
) -> OperatorStatus {
    let mut object = OperatorStatus::new(
        &target.name,
        OperatorStatusSpec {
            condition: OperatorStatusCondition::from(condition),
            version: version.to_string(),
            last_update: chrono::Utc::now().to_rfc3339(),
        },
    );
    object.metadata.namespace = Some(target.namespace.clone());
    object
}

#[async_trait]
impl StatusSink for KubeStatusSink {
    async fn publish_condition(
        &self,
        target: &ConfigRef,
        condition: &StatusCondition,
    ) -> Result<(), SyncError> {
        let api: Api<OperatorStatus> = Api::namespaced(self.client.clone(), &target.namespace);
        let object = operator_status_for(target, condition, &self.version);

        api.patch(
            &target.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&object),
        )
        .await
        .map_err(|e| {
            SyncError::transient(
                Stage::Status,
                format!("failed to publish {} condition for {target}: {e}", condition.kind),
            )
        })?;

        debug!("Published {} condition for {}: {}", condition.kind, target, condition.message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::ConditionKind;

    #[test]
    fn test_operator_status_for_condition() {
        let target = ConfigRef::new("ns", "version");
        let condition = StatusCondition {
            kind: ConditionKind::Degraded,
            message: "apply stage failed: timeout".to_string(),
        };

        let object = operator_status_for(&target, &condition, "0.1.0");

        assert_eq!(object.metadata.name.as_deref(), Some("version"));
        assert_eq!(object.metadata.namespace.as_deref(), Some("ns"));
        assert_eq!(object.spec.condition.r#type, "Degraded");
        assert_eq!(object.spec.condition.message, "apply stage failed: timeout");
        assert_eq!(object.spec.version, "0.1.0");
        assert!(chrono::DateTime::parse_from_rfc3339(&object.spec.last_update).is_ok());
    }
}
