//! # Kubernetes Providers
//!
//! Collaborators backed by the Kubernetes API. All writes go through
//! server-side apply or cache-checked create/replace so repeating a sync is safe.

mod applier;
mod config_store;
mod definitions;
mod status;

pub use applier::KubePayloadApplier;
pub use config_store::{desired_config_from, KubeConfigStore};
pub use definitions::{is_established, KubeDefinitionInstaller};
pub use status::KubeStatusSink;
