//! # Providers
//!
//! Collaborators the sync pipeline drives, behind narrow async traits.
//!
//! - `kubernetes` - Kubernetes-backed implementations (CRD install, cached config store,
//!   server-side apply of payloads, OperatorStatus publishing)
//! - `filesystem` - update payload fetcher reading extracted manifests from disk
//! - `memory` - in-process implementations for tests and local wiring
//!
//! Every implementation must be idempotent: a retried sync repeats stages
//! rather than rolling anything back.

pub mod filesystem;
pub mod kubernetes;
pub mod memory;

use crate::controller::reconciler::{ConfigRef, DesiredConfig, StatusCondition, SyncError};
use async_trait::async_trait;
use kube::api::DynamicObject;
use std::path::{Path, PathBuf};

/// Result of an apply-if-changed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The authoritative stored config
    pub actual: DesiredConfig,
    /// Whether a write was issued
    pub changed: bool,
}

/// Opaque update artifact. The pipeline sequences fetch and apply but never
/// looks inside.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    /// Directory the payload was read from
    pub source: PathBuf,
    /// Manifests in apply order
    pub manifests: Vec<DynamicObject>,
}

/// Installs the resource definitions the desired config depends on
#[async_trait]
pub trait DefinitionInstaller: Send + Sync {
    async fn ensure_definitions(&self) -> Result<(), SyncError>;
}

/// Persisted desired config, read through a cache and written remotely
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Create the config if absent, update it if it differs, otherwise do nothing
    async fn apply_if_changed(&self, candidate: &DesiredConfig) -> Result<ApplyOutcome, SyncError>;
}

/// Retrieves the update payload for a config
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    async fn fetch(&self, path_prefix: &Path, config: &DesiredConfig) -> Result<Payload, SyncError>;
}

/// Applies an update payload to the cluster
#[async_trait]
pub trait PayloadApplier: Send + Sync {
    async fn apply(&self, config: &DesiredConfig, payload: &Payload) -> Result<(), SyncError>;
}

/// Publishes the controller's progress condition
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish_condition(
        &self,
        target: &ConfigRef,
        condition: &StatusCondition,
    ) -> Result<(), SyncError>;
}

/// Local directory holding the payload for a config: `<prefix>/<channel>`
pub fn payload_dir(path_prefix: &Path, config: &DesiredConfig) -> PathBuf {
    path_prefix.join(&config.channel)
}
