//! # Custom Resource Definitions
//!
//! CRD types owned by the Cluster Version Controller.
//!
//! - `CVOConfig` holds the desired configuration the cluster converges to.
//! - `OperatorStatus` carries the last published progress condition.

mod status;

pub use status::{OperatorStatus, OperatorStatusCondition, OperatorStatusSpec};

use crate::controller::reconciler::DesiredConfig;
use serde::{Deserialize, Serialize};

/// CVOConfig Custom Resource Definition
///
/// There is exactly one CVOConfig per cluster. The controller creates it on first
/// sync and only rewrites it when the computed config differs from the stored one.
///
/// # Example
///
/// ```yaml
/// apiVersion: clusterversion.openshift.io/v1
/// kind: CVOConfig
/// metadata:
///   name: version
///   namespace: openshift-cluster-version
/// spec:
///   upstream: http://localhost:8080/graph
///   channel: fast
///   clusterID: 5b8b2bc6-1a0c-4c9c-9f64-2d7f3c1e5e51
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "CVOConfig",
    group = "clusterversion.openshift.io",
    version = "v1",
    namespaced,
    shortname = "cvoc",
    printcolumn = r#"{"name":"Channel", "type":"string", "jsonPath":".spec.channel"}, {"name":"Upstream", "type":"string", "jsonPath":".spec.upstream"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CVOConfigSpec {
    /// URL of the upstream update graph
    pub upstream: String,
    /// Update channel the cluster follows
    pub channel: String,
    /// Cluster identifier, an RFC4122 version-4 UUID
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
}

impl From<&DesiredConfig> for CVOConfigSpec {
    fn from(config: &DesiredConfig) -> Self {
        Self {
            upstream: config.upstream.clone(),
            channel: config.channel.clone(),
            cluster_id: config.cluster_id.to_string(),
        }
    }
}

impl CVOConfig {
    /// Build a namespaced CVOConfig object for a desired config
    pub fn from_desired(config: &DesiredConfig) -> Self {
        let mut object = CVOConfig::new(&config.name, CVOConfigSpec::from(config));
        object.metadata.namespace = Some(config.namespace.clone());
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;
    use uuid::Uuid;

    fn desired() -> DesiredConfig {
        DesiredConfig {
            namespace: "openshift-cluster-version".to_string(),
            name: "version".to_string(),
            upstream: "http://localhost:8080/graph".to_string(),
            channel: "fast".to_string(),
            cluster_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_crd_names() {
        let crd = CVOConfig::crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("cvoconfigs.clusterversion.openshift.io")
        );
        assert_eq!(crd.spec.scope, "Namespaced");
    }

    #[test]
    fn test_from_desired_sets_identity_and_spec() {
        let config = desired();
        let object = CVOConfig::from_desired(&config);
        assert_eq!(object.metadata.name.as_deref(), Some("version"));
        assert_eq!(
            object.metadata.namespace.as_deref(),
            Some("openshift-cluster-version")
        );
        assert_eq!(object.spec.channel, "fast");
        assert_eq!(object.spec.cluster_id, config.cluster_id.to_string());
    }

    #[test]
    fn test_spec_serializes_cluster_id_field_name() {
        let spec = CVOConfigSpec::from(&desired());
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json.get("clusterID").is_some());
        assert!(json.get("upstream").is_some());
    }
}
