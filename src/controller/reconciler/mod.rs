//! # Reconciler
//!
//! The sync pipeline run for every dequeued work key.
//!
//! ## Sync Flow
//!
//! 1. Ensure the CVOConfig/OperatorStatus definitions exist
//! 2. Resolve the desired config (compute, validate, apply-if-changed)
//! 3. Publish a `Working` condition
//! 4. Fetch the update payload for the config's channel
//! 5. Apply the update payload
//! 6. Publish a `Done` condition
//!
//! The first failing stage aborts the rest and its error is returned unchanged.

pub mod resolver;
pub mod status;
pub mod sync;
pub mod types;
pub mod validation;

pub use resolver::{ConfigInputs, ConfigResolver, ConfigSource, PlaceholderConfigSource};
pub use status::{ConditionKind, StatusCondition};
pub use sync::{SyncHandler, SyncPipeline};
pub use types::{ConfigRef, DesiredConfig, Stage, SyncError};
pub use validation::{validate_cluster_id, ValidationError};
