//! # Config Resolver
//!
//! Computes the candidate desired config, validates it and makes it
//! authoritative through the store's apply-if-changed operation.

use crate::constants::{DEFAULT_CHANNEL, DEFAULT_UPSTREAM};
use crate::controller::reconciler::types::{ConfigRef, DesiredConfig, SyncError};
use crate::controller::reconciler::validation::validate_cluster_id;
use crate::provider::ConfigStore;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Inputs the desired config is computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigInputs {
    pub upstream: String,
    pub channel: String,
    pub cluster_id: Uuid,
}

/// Source of desired config inputs
pub trait ConfigSource: Send + Sync {
    fn inputs(&self) -> ConfigInputs;
}

/// Fixed upstream and channel with a random cluster identifier.
///
/// The identifier is drawn once per source so repeated syncs produce the same
/// candidate and apply-if-changed settles into a no-op. Rewriting the stored
/// object on every pass would re-trigger the watch and keep the queue busy.
#[derive(Debug, Clone)]
pub struct PlaceholderConfigSource {
    cluster_id: Uuid,
}

impl PlaceholderConfigSource {
    pub fn new() -> Self {
        Self {
            cluster_id: Uuid::new_v4(),
        }
    }
}

impl Default for PlaceholderConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for PlaceholderConfigSource {
    fn inputs(&self) -> ConfigInputs {
        ConfigInputs {
            upstream: DEFAULT_UPSTREAM.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            cluster_id: self.cluster_id,
        }
    }
}

/// Resolves the desired config for one CVOConfig object
pub struct ConfigResolver {
    target: ConfigRef,
    source: Arc<dyn ConfigSource>,
    store: Arc<dyn ConfigStore>,
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl ConfigResolver {
    pub fn new(
        target: ConfigRef,
        source: Arc<dyn ConfigSource>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        Self {
            target,
            source,
            store,
        }
    }

    /// Candidate config computed from the current inputs, not yet validated
    pub fn candidate(&self) -> DesiredConfig {
        let inputs = self.source.inputs();
        DesiredConfig {
            namespace: self.target.namespace.clone(),
            name: self.target.name.clone(),
            upstream: inputs.upstream,
            channel: inputs.channel,
            cluster_id: inputs.cluster_id,
        }
    }

    /// Validate the candidate and apply it if it differs from the stored object
    ///
    /// # Returns
    ///
    /// The authoritative config: the stored object when it already matches,
    /// otherwise the freshly written one.
    ///
    /// # Errors
    ///
    /// * [`SyncError::Validation`] - the candidate failed validation; the store
    ///   was not touched
    /// * whatever the store returns when reading or writing fails
    pub async fn resolve(&self) -> Result<DesiredConfig, SyncError> {
        let candidate = self.candidate();
        validate_cluster_id(&candidate.cluster_id)?;

        let outcome = self.store.apply_if_changed(&candidate).await?;
        if outcome.changed {
            info!("Applied desired config {}", outcome.actual);
        } else {
            debug!("Desired config {} unchanged", outcome.actual);
        }
        Ok(outcome.actual)
    }
}
