//! # Metrics Server Settings
//!
//! Where `/metrics`, `/healthz` and `/readyz` are served, and how long startup
//! may take before the controller gives up or reports ready anyway.
//!
//! | Variable | Default |
//! |---|---|
//! | `METRICS_BIND_ADDRESS` | `0.0.0.0` |
//! | `METRICS_PORT` | `5000` |
//! | `SERVER_STARTUP_TIMEOUT_SECS` | `10` |
//! | `SERVER_POLL_INTERVAL_MS` | `50` |
//! | `CACHE_SYNC_TIMEOUT_SECS` | `30` |

use super::env_var_or_default;
use crate::constants::{
    DEFAULT_CACHE_SYNC_TIMEOUT_SECS, DEFAULT_METRICS_BIND_ADDRESS, DEFAULT_METRICS_PORT,
    DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Metrics and health endpoint server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub metrics_port: u16,
    /// Startup fails if the listener is not bound within this many seconds
    pub startup_timeout_secs: u64,
    /// How often startup checks whether the listener is bound (milliseconds)
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for the CVOConfig cache before `/readyz` turns ok
    pub cache_sync_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_METRICS_BIND_ADDRESS,
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
            cache_sync_timeout_secs: DEFAULT_CACHE_SYNC_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// Unparseable values fall back to the default rather than failing startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env_var_or_default("METRICS_BIND_ADDRESS", defaults.bind_address),
            metrics_port: env_var_or_default("METRICS_PORT", defaults.metrics_port),
            startup_timeout_secs: env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                defaults.startup_timeout_secs,
            ),
            poll_interval_ms: env_var_or_default(
                "SERVER_POLL_INTERVAL_MS",
                defaults.poll_interval_ms,
            ),
            cache_sync_timeout_secs: env_var_or_default(
                "CACHE_SYNC_TIMEOUT_SECS",
                defaults.cache_sync_timeout_secs,
            ),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.metrics_port)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cache_sync_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_sync_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listens_on_all_interfaces() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn test_durations_follow_fields() {
        let config = ServerConfig {
            startup_timeout_secs: 3,
            poll_interval_ms: 20,
            cache_sync_timeout_secs: 7,
            ..ServerConfig::default()
        };
        assert_eq!(config.startup_timeout(), Duration::from_secs(3));
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.cache_sync_timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_custom_bind_address() {
        let config = ServerConfig {
            bind_address: "127.0.0.1".parse().unwrap(),
            metrics_port: 9090,
            ..ServerConfig::default()
        };
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9090");
    }
}
