//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, Kubernetes client setup and wiring of the queue, sync
//! pipeline and workers.

use crate::config::{ControllerConfig, ServerConfig};
use crate::constants::{WORK_QUEUE_KEY, WORK_QUEUE_NAME};
use crate::controller::reconciler::{ConfigResolver, PlaceholderConfigSource, SyncPipeline};
use crate::controller::{
    Controller, EventBridge, ExponentialFailureRateLimiter, RetryPolicy, WorkKey, WorkQueue,
    WorkSink,
};
use crate::crd::CVOConfig;
use crate::observability;
use crate::provider::filesystem::DirectoryPayloadFetcher;
use crate::provider::kubernetes::{
    KubeConfigStore, KubeDefinitionInstaller, KubePayloadApplier, KubeStatusSink,
};
use crate::provider::StatusSink;
use crate::runtime::server::{start_server, ServerState};
use anyhow::{anyhow, Context, Result};
use kube::Client;
use kube_runtime::reflector;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Settings the controller was started with
    pub config: ControllerConfig,
    /// Workers, queue and retry policy
    pub controller: Arc<Controller>,
    /// Watch notifications -> work key
    pub bridge: EventBridge,
    /// Reflector cache read by the config store
    pub config_cache: reflector::Store<CVOConfig>,
    /// Writer side of `config_cache`, driven by the CVOConfig watcher
    pub config_writer: reflector::store::Writer<CVOConfig>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Upper bound on waiting for the CVOConfig cache
    pub cache_sync_timeout: Duration,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("controller", &self.controller)
            .field("bridge", &self.bridge)
            .field("server_state", &self.server_state)
            .field("cache_sync_timeout", &self.cache_sync_timeout)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Queue, sync pipeline and worker wiring
pub async fn initialize(
    config: ControllerConfig,
    server_config: ServerConfig,
) -> Result<InitializationResult> {
    // Configure rustls crypto provider FIRST, before any other operations
    // Required for rustls 0.23+ when no default provider is set via features
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_provider| anyhow!("Failed to install rustls crypto provider"))?;

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cluster_version_controller=info".into()),
        )
        .try_init()
    {
        eprintln!("Tracing subscriber already initialized: {e}");
    }

    info!(
        "Starting Cluster Version Controller v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        namespace = %config.namespace,
        name = %config.name,
        node = %config.node_name,
        workers = config.workers,
        "Controller configuration loaded"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());

    // Start server in background task and wait for it to bind before proceeding
    let server_state_clone = Arc::clone(&server_state);
    let server_addr = server_config.socket_addr();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_addr, server_state_clone).await {
            error!("HTTP server error: {:#}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let (config_cache, config_writer) = reflector::store::<CVOConfig>();

    let queue: WorkQueue<WorkKey> = WorkQueue::new(
        WORK_QUEUE_NAME,
        ExponentialFailureRateLimiter::new(config.queue_base_delay(), config.queue_max_delay()),
    );
    let sink: Arc<dyn WorkSink> = Arc::new(queue.clone());
    let bridge = EventBridge::new(sink, WORK_QUEUE_KEY);

    let status: Arc<dyn StatusSink> = Arc::new(KubeStatusSink::new(
        client.clone(),
        env!("CARGO_PKG_VERSION"),
    ));

    let resolver = ConfigResolver::new(
        config.config_ref(),
        Arc::new(PlaceholderConfigSource::new()),
        Arc::new(KubeConfigStore::new(client.clone(), config_cache.clone())),
    );

    let pipeline = SyncPipeline::new(
        Arc::new(KubeDefinitionInstaller::new(client.clone())),
        resolver,
        Arc::clone(&status),
        Arc::new(DirectoryPayloadFetcher::new()),
        Arc::new(KubePayloadApplier::new(client.clone())),
        config.payload_path_prefix.clone(),
    );

    let controller = Arc::new(Controller::new(
        queue,
        Arc::new(pipeline),
        status,
        config.config_ref(),
        RetryPolicy {
            max_retries: config.max_retries,
            fail_fast_on_validation: config.fail_fast_on_validation,
        },
    ));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        config,
        controller,
        bridge,
        config_cache,
        config_writer,
        server_state,
        cache_sync_timeout: server_config.cache_sync_timeout(),
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        // Check if server task crashed
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.is_serving.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}
