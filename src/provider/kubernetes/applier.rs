//! # Payload Applier
//!
//! Server-side applies every manifest of an update payload, in order.
//! Kinds are resolved through API discovery so any served resource type can be
//! part of a payload.

use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::{DesiredConfig, Stage, SyncError};
use crate::observability;
use crate::provider::{Payload, PayloadApplier};
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::discovery::{pinned_kind, Scope};
use kube::Client;
use tracing::{debug, info};

/// Applies payload manifests with server-side apply
#[derive(Clone)]
pub struct KubePayloadApplier {
    client: Client,
}

impl std::fmt::Debug for KubePayloadApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubePayloadApplier").finish_non_exhaustive()
    }
}

impl KubePayloadApplier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn apply_manifest(&self, manifest: &DynamicObject) -> Result<(), SyncError> {
        let (gvk, name) = manifest_identity(manifest)?;

        let (resource, capabilities) = pinned_kind(&self.client, &gvk).await.map_err(|e| {
            SyncError::transient(
                Stage::Apply,
                format!("failed to discover {}/{} {}: {e}", gvk.group, gvk.version, gvk.kind),
            )
        })?;

        let namespace = manifest.metadata.namespace.as_deref();
        let api: Api<DynamicObject> = match (&capabilities.scope, namespace) {
            (Scope::Cluster, _) => Api::all_with(self.client.clone(), &resource),
            (Scope::Namespaced, Some(namespace)) => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
            (Scope::Namespaced, None) => {
                Api::default_namespaced_with(self.client.clone(), &resource)
            }
        };

        api.patch(
            name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(manifest),
        )
        .await
        .map_err(|e| {
            SyncError::transient(
                Stage::Apply,
                format!("failed to apply {} {name}: {e}", gvk.kind),
            )
        })?;

        debug!("Applied {} {}", gvk.kind, name);
        Ok(())
    }
}

/// Kind and name of a manifest; both are required to apply it
pub fn manifest_identity(manifest: &DynamicObject) -> Result<(GroupVersionKind, &str), SyncError> {
    let types = manifest
        .types
        .as_ref()
        .ok_or_else(|| SyncError::permanent(Stage::Apply, "manifest has no apiVersion/kind"))?;
    let gvk = GroupVersionKind::try_from(types).map_err(|e| {
        SyncError::permanent(
            Stage::Apply,
            format!("manifest has invalid apiVersion {:?}: {e}", types.api_version),
        )
    })?;
    let name = manifest.metadata.name.as_deref().ok_or_else(|| {
        SyncError::permanent(Stage::Apply, format!("{} manifest has no metadata.name", gvk.kind))
    })?;
    Ok((gvk, name))
}

#[async_trait]
impl PayloadApplier for KubePayloadApplier {
    async fn apply(&self, config: &DesiredConfig, payload: &Payload) -> Result<(), SyncError> {
        for manifest in &payload.manifests {
            self.apply_manifest(manifest).await?;
        }

        observability::metrics::increment_manifests_applied(payload.manifests.len());
        info!(
            "Applied {} manifest(s) from {} for {}",
            payload.manifests.len(),
            payload.source.display(),
            config.config_ref()
        );
        Ok(())
    }
}
