//! # Cached Config Store
//!
//! Apply-if-changed for the CVOConfig object.
//!
//! Reads go through the reflector cache fed by the CVOConfig watch; writes go to
//! the API server only when the object is missing or its spec differs. A stale
//! cache surfaces as a create conflict or replace conflict, which is transient
//! and resolved on the next retry once the cache has caught up.

use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::{DesiredConfig, Stage, SyncError};
use crate::crd::{CVOConfig, CVOConfigSpec};
use crate::provider::{ApplyOutcome, ConfigStore};
use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::Client;
use kube_runtime::reflector::{ObjectRef, Store};
use tracing::{debug, info};
use uuid::Uuid;

/// Config store reading through a reflector cache
#[derive(Clone)]
pub struct KubeConfigStore {
    client: Client,
    cache: Store<CVOConfig>,
}

impl std::fmt::Debug for KubeConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeConfigStore")
            .field("cached", &self.cache.state().len())
            .finish_non_exhaustive()
    }
}

impl KubeConfigStore {
    pub fn new(client: Client, cache: Store<CVOConfig>) -> Self {
        Self { client, cache }
    }

    fn post_params() -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(FIELD_MANAGER.to_string()),
        }
    }
}

/// Convert a stored CVOConfig back into a desired config
///
/// A stored cluster identifier that does not parse as a UUID is permanent: the
/// object was written by something other than this controller.
pub fn desired_config_from(object: &CVOConfig) -> Result<DesiredConfig, SyncError> {
    let name = object
        .metadata
        .name
        .clone()
        .ok_or_else(|| SyncError::permanent(Stage::Resolve, "stored CVOConfig has no name"))?;
    let namespace = object.metadata.namespace.clone().unwrap_or_default();
    let cluster_id = Uuid::parse_str(&object.spec.cluster_id).map_err(|e| {
        SyncError::permanent(
            Stage::Resolve,
            format!(
                "stored CVOConfig {namespace}/{name} has malformed clusterID {:?}: {e}",
                object.spec.cluster_id
            ),
        )
    })?;

    Ok(DesiredConfig {
        namespace,
        name,
        upstream: object.spec.upstream.clone(),
        channel: object.spec.channel.clone(),
        cluster_id,
    })
}

#[async_trait]
impl ConfigStore for KubeConfigStore {
    async fn apply_if_changed(&self, candidate: &DesiredConfig) -> Result<ApplyOutcome, SyncError> {
        let api: Api<CVOConfig> = Api::namespaced(self.client.clone(), &candidate.namespace);
        let desired_spec = CVOConfigSpec::from(candidate);
        let key = ObjectRef::new(&candidate.name).within(&candidate.namespace);

        let Some(existing) = self.cache.get(&key) else {
            let created = api
                .create(&Self::post_params(), &CVOConfig::from_desired(candidate))
                .await
                .map_err(|e| {
                    SyncError::transient(
                        Stage::Resolve,
                        format!("failed to create CVOConfig {}: {e}", candidate.config_ref()),
                    )
                })?;
            info!("Created CVOConfig {}", candidate.config_ref());
            return Ok(ApplyOutcome {
                actual: desired_config_from(&created)?,
                changed: true,
            });
        };

        if existing.spec == desired_spec {
            debug!("CVOConfig {} matches cache, skipping write", candidate.config_ref());
            return Ok(ApplyOutcome {
                actual: desired_config_from(&existing)?,
                changed: false,
            });
        }

        // Replace carries the cached resourceVersion, so a concurrent writer causes a conflict
        let mut updated = (*existing).clone();
        updated.spec = desired_spec;
        let replaced = api
            .replace(&candidate.name, &Self::post_params(), &updated)
            .await
            .map_err(|e| {
                SyncError::transient(
                    Stage::Resolve,
                    format!("failed to update CVOConfig {}: {e}", candidate.config_ref()),
                )
            })?;
        info!("Updated CVOConfig {}", candidate.config_ref());
        Ok(ApplyOutcome {
            actual: desired_config_from(&replaced)?,
            changed: true,
        })
    }
}
