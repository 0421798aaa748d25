//! # Reconciler Types
//!
//! The desired config model and the tagged error every sync stage returns.

use crate::controller::reconciler::validation::ValidationError;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Namespace/name of the desired config object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigRef {
    pub namespace: String,
    pub name: String,
}

impl ConfigRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ConfigRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The single authoritative description of what the cluster converges to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredConfig {
    pub namespace: String,
    pub name: String,
    /// URL of the upstream update graph
    pub upstream: String,
    /// Update channel the cluster follows
    pub channel: String,
    /// Must be an RFC4122 version-4 UUID
    pub cluster_id: Uuid,
}

impl DesiredConfig {
    pub fn config_ref(&self) -> ConfigRef {
        ConfigRef::new(&self.namespace, &self.name)
    }
}

impl fmt::Display for DesiredConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} (channel {}, upstream {}, clusterID {})",
            self.namespace, self.name, self.channel, self.upstream, self.cluster_id
        )
    }
}

/// Sync pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Definitions,
    Resolve,
    Status,
    Fetch,
    Apply,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Definitions => "definitions",
            Stage::Resolve => "resolve",
            Stage::Status => "status",
            Stage::Fetch => "fetch",
            Stage::Apply => "apply",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a sync stage
///
/// Errors travel unchanged from the failing stage to the worker, which decides
/// between requeue and degrade. `Clone + PartialEq` so the worker can publish the
/// error it received and tests can compare what a stage returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Infrastructure or API unavailability, expected to clear on retry
    #[error("{stage} stage failed: {message}")]
    Transient { stage: Stage, message: String },
    /// Generated config failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Malformed input that retrying cannot fix
    #[error("{stage} stage failed permanently: {message}")]
    Permanent { stage: Stage, message: String },
}

impl SyncError {
    pub fn transient(stage: Stage, err: impl fmt::Display) -> Self {
        SyncError::Transient {
            stage,
            message: err.to_string(),
        }
    }

    pub fn permanent(stage: Stage, err: impl fmt::Display) -> Self {
        SyncError::Permanent {
            stage,
            message: err.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }

    /// Stage the error originated from
    pub fn stage(&self) -> Stage {
        match self {
            SyncError::Transient { stage, .. } | SyncError::Permanent { stage, .. } => *stage,
            SyncError::Validation(_) => Stage::Resolve,
        }
    }

    /// Error class, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Transient { .. } => "transient",
            SyncError::Validation(_) => "validation",
            SyncError::Permanent { .. } => "permanent",
        }
    }
}
