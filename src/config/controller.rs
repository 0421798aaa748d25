//! # Reconciliation Settings
//!
//! Identity of the desired config object, worker count and retry ladder settings.

use super::env_var_or_default;
use crate::constants::*;
use crate::controller::reconciler::ConfigRef;
use std::path::PathBuf;
use std::time::Duration;

/// Reconciliation configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace of the CVOConfig / OperatorStatus objects
    pub namespace: String,
    /// Name of the CVOConfig / OperatorStatus objects
    pub name: String,
    /// Node the controller runs on (informational)
    pub node_name: String,
    /// Number of workers pulling from the queue
    pub workers: usize,
    /// Requeues allowed before the key is dropped and reported as Degraded
    pub max_retries: u32,
    /// Base delay of the exponential failure rate limiter (milliseconds)
    pub queue_base_delay_ms: u64,
    /// Ceiling of the exponential failure rate limiter (seconds)
    pub queue_max_delay_secs: u64,
    /// Directory under which update payloads are extracted
    pub payload_path_prefix: PathBuf,
    /// Skip the retry ladder for validation failures
    /// Validation failures are deterministic, but by default they are retried like any other error
    pub fail_fast_on_validation: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: DEFAULT_NAME.to_string(),
            node_name: String::new(),
            workers: DEFAULT_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            queue_base_delay_ms: DEFAULT_QUEUE_BASE_DELAY_MS,
            queue_max_delay_secs: DEFAULT_QUEUE_MAX_DELAY_SECS,
            payload_path_prefix: PathBuf::from(DEFAULT_UPDATE_PAYLOADS_PATH_PREFIX),
            fail_fast_on_validation: false,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            namespace: env_var_or_default("CVO_NAMESPACE", defaults.namespace),
            name: env_var_or_default("CVO_NAME", defaults.name),
            node_name: env_var_or_default("NODE_NAME", defaults.node_name),
            workers: env_var_or_default("WORKERS", defaults.workers),
            max_retries: env_var_or_default("MAX_RETRIES", defaults.max_retries),
            queue_base_delay_ms: env_var_or_default(
                "QUEUE_BASE_DELAY_MS",
                defaults.queue_base_delay_ms,
            ),
            queue_max_delay_secs: env_var_or_default(
                "QUEUE_MAX_DELAY_SECS",
                defaults.queue_max_delay_secs,
            ),
            payload_path_prefix: env_var_or_default(
                "PAYLOAD_PATH_PREFIX",
                defaults.payload_path_prefix,
            ),
            fail_fast_on_validation: env_var_or_default(
                "FAIL_FAST_ON_VALIDATION",
                defaults.fail_fast_on_validation,
            ),
        }
    }

    /// Reference to the desired config object this controller owns
    pub fn config_ref(&self) -> ConfigRef {
        ConfigRef::new(&self.namespace, &self.name)
    }

    pub fn queue_base_delay(&self) -> Duration {
        Duration::from_millis(self.queue_base_delay_ms)
    }

    pub fn queue_max_delay(&self) -> Duration {
        Duration::from_secs(self.queue_max_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_retry_ladder() {
        let config = ControllerConfig::default();
        assert_eq!(config.max_retries, 15);
        assert_eq!(config.queue_base_delay(), DEFAULT_QUEUE_BASE_DELAY);
        assert_eq!(config.queue_max_delay(), DEFAULT_QUEUE_MAX_DELAY);
        assert_eq!(config.queue_base_delay(), Duration::from_millis(5));
        assert!(!config.fail_fast_on_validation);
    }

    #[test]
    fn test_config_ref_uses_namespace_and_name() {
        let config = ControllerConfig {
            namespace: "ns".to_string(),
            name: "cfg".to_string(),
            ..ControllerConfig::default()
        };
        assert_eq!(config.config_ref().to_string(), "ns/cfg");
    }
}
