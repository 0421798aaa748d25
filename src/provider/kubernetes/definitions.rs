//! # Definition Installer
//!
//! Server-side applies the CVOConfig and OperatorStatus CRDs.
//!
//! Runs at the start of every sync: the CVOConfig cannot be persisted until its
//! schema is registered, and applying an unchanged CRD is a no-op on the API server.

use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::{Stage, SyncError};
use crate::crd::{CVOConfig, OperatorStatus};
use crate::provider::DefinitionInstaller;
use async_trait::async_trait;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};
use tracing::debug;

/// Installs the controller's CRDs
#[derive(Clone)]
pub struct KubeDefinitionInstaller {
    client: Client,
}

impl std::fmt::Debug for KubeDefinitionInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeDefinitionInstaller").finish_non_exhaustive()
    }
}

impl KubeDefinitionInstaller {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Whether the API server reports the CRD as established (ready to serve)
pub fn is_established(crd: &CustomResourceDefinition) -> bool {
    crd.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Established" && c.status == "True")
        })
}

#[async_trait]
impl DefinitionInstaller for KubeDefinitionInstaller {
    async fn ensure_definitions(&self) -> Result<(), SyncError> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let params = PatchParams::apply(FIELD_MANAGER).force();

        for crd in [CVOConfig::crd(), OperatorStatus::crd()] {
            let name = crd.metadata.name.clone().ok_or_else(|| {
                SyncError::permanent(Stage::Definitions, "generated CRD has no name")
            })?;

            let applied = api
                .patch(&name, &params, &Patch::Apply(&crd))
                .await
                .map_err(|e| {
                    SyncError::transient(
                        Stage::Definitions,
                        format!("failed to apply CRD {name}: {e}"),
                    )
                })?;

            // A freshly created CRD is not served until established; retrying picks it up
            if !is_established(&applied) {
                return Err(SyncError::transient(
                    Stage::Definitions,
                    format!("CRD {name} is not yet established"),
                ));
            }
            debug!("CRD {} is established", name);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
        CustomResourceDefinitionCondition, CustomResourceDefinitionStatus,
    };

    fn condition(type_: &str, status: &str) -> CustomResourceDefinitionCondition {
        CustomResourceDefinitionCondition {
            type_: type_.to_string(),
            status: status.to_string(),
            ..CustomResourceDefinitionCondition::default()
        }
    }

    #[test]
    fn test_generated_crd_is_not_established() {
        assert!(!is_established(&CVOConfig::crd()));
    }

    #[test]
    fn test_established_condition_detected() {
        let mut crd = OperatorStatus::crd();
        crd.status = Some(CustomResourceDefinitionStatus {
            conditions: Some(vec![
                condition("NamesAccepted", "True"),
                condition("Established", "True"),
            ]),
            ..CustomResourceDefinitionStatus::default()
        });
        assert!(is_established(&crd));
    }

    #[test]
    fn test_established_false_is_not_established() {
        let mut crd = CVOConfig::crd();
        crd.status = Some(CustomResourceDefinitionStatus {
            conditions: Some(vec![condition("Established", "False")]),
            ..CustomResourceDefinitionStatus::default()
        });
        assert!(!is_established(&crd));
    }
}
