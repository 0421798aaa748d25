//! # Constants
//!
//! Default values shared across the controller.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Number of times the work key is requeued before it is dropped and reported
/// as Degraded. With the default rate limiter (5ms * 2^n) the requeue delays are:
///
/// 5ms, 10ms, 20ms, 40ms, 80ms, 160ms, 320ms, 640ms, 1.3s, 2.6s, 5.1s, 10.2s, 20.4s, 41s, 82s
pub const DEFAULT_MAX_RETRIES: u32 = 15;

/// Base delay of the per-key exponential failure rate limiter
pub const DEFAULT_QUEUE_BASE_DELAY_MS: u64 = 5;

/// Ceiling of the per-key exponential failure rate limiter
pub const DEFAULT_QUEUE_MAX_DELAY_SECS: u64 = 1000;

/// Name of the work queue (used as a metrics label)
pub const WORK_QUEUE_NAME: &str = "clusterversionoperator";

/// The single key ever enqueued. There is exactly one desired config per cluster.
pub const WORK_QUEUE_KEY: &str = "kube-system/installconfig";

/// Local directory under which update payloads are extracted, one per channel
pub const DEFAULT_UPDATE_PAYLOADS_PATH_PREFIX: &str = "/etc/cvo/updatepayloads";

/// Placeholder upstream update graph until install-time config is wired in
pub const DEFAULT_UPSTREAM: &str = "http://localhost:8080/graph";

/// Placeholder update channel until install-time config is wired in
pub const DEFAULT_CHANNEL: &str = "fast";

/// Namespace holding the CVOConfig and OperatorStatus objects
pub const DEFAULT_NAMESPACE: &str = "openshift-cluster-version";

/// Name of the CVOConfig and OperatorStatus objects
pub const DEFAULT_NAME: &str = "version";

/// Number of concurrent workers
pub const DEFAULT_WORKERS: usize = 2;

/// Field manager used for every server-side apply
pub const FIELD_MANAGER: &str = "cluster-version-controller";

/// Address the metrics and health server binds to
pub const DEFAULT_METRICS_BIND_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// HTTP port for metrics and health endpoints
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// How long to wait for the HTTP server to bind
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// How often to poll the HTTP server during startup
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// How long to wait for the CVOConfig cache to sync once its CRD exists
pub const DEFAULT_CACHE_SYNC_TIMEOUT_SECS: u64 = 30;

/// Default base delay as a `Duration`
pub const DEFAULT_QUEUE_BASE_DELAY: Duration = Duration::from_millis(DEFAULT_QUEUE_BASE_DELAY_MS);

/// Default ceiling as a `Duration`
pub const DEFAULT_QUEUE_MAX_DELAY: Duration = Duration::from_secs(DEFAULT_QUEUE_MAX_DELAY_SECS);
