//! # OperatorStatus
//!
//! The object the controller publishes its progress condition to.
//! Each publish overwrites the previous condition; no history is kept.

use serde::{Deserialize, Serialize};

/// OperatorStatus Custom Resource Definition
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "OperatorStatus",
    group = "operatorstatus.openshift.io",
    version = "v1",
    namespaced,
    shortname = "os",
    printcolumn = r#"{"name":"Condition", "type":"string", "jsonPath":".spec.condition.type"}, {"name":"Message", "type":"string", "jsonPath":".spec.condition.message"}, {"name":"Updated", "type":"string", "jsonPath":".spec.lastUpdate"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OperatorStatusSpec {
    /// Latest observed condition
    pub condition: OperatorStatusCondition,
    /// Version of the controller that published the condition
    pub version: String,
    /// Time the condition was published (RFC3339)
    pub last_update: String,
}

/// Condition published by the controller
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperatorStatusCondition {
    /// Type of condition (Working, Done, Degraded)
    pub r#type: String,
    /// Message describing the condition
    pub message: String,
}
