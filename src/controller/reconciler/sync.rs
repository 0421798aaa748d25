//! # Sync Pipeline
//!
//! The ordered convergence stages run once per dequeued key.
//!
//! Stages are strictly sequential and the first failure aborts the rest. There
//! is no rollback: each collaborator is idempotent, so the retried sync simply
//! repeats the stages that already succeeded.

use crate::controller::reconciler::resolver::ConfigResolver;
use crate::controller::reconciler::status::StatusCondition;
use crate::controller::reconciler::types::SyncError;
use crate::observability;
use crate::provider::{DefinitionInstaller, PayloadApplier, PayloadFetcher, StatusSink};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, Instrument};

/// Handles one dequeued work key
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn sync(&self, key: &str) -> Result<(), SyncError>;
}

/// Definitions -> resolve -> Working -> fetch -> apply -> Done
pub struct SyncPipeline {
    definitions: Arc<dyn DefinitionInstaller>,
    resolver: ConfigResolver,
    status: Arc<dyn StatusSink>,
    fetcher: Arc<dyn PayloadFetcher>,
    applier: Arc<dyn PayloadApplier>,
    payload_path_prefix: PathBuf,
}

impl std::fmt::Debug for SyncPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPipeline")
            .field("resolver", &self.resolver)
            .field("payload_path_prefix", &self.payload_path_prefix)
            .finish_non_exhaustive()
    }
}

impl SyncPipeline {
    pub fn new(
        definitions: Arc<dyn DefinitionInstaller>,
        resolver: ConfigResolver,
        status: Arc<dyn StatusSink>,
        fetcher: Arc<dyn PayloadFetcher>,
        applier: Arc<dyn PayloadApplier>,
        payload_path_prefix: impl Into<PathBuf>,
    ) -> Self {
        Self {
            definitions,
            resolver,
            status,
            fetcher,
            applier,
            payload_path_prefix: payload_path_prefix.into(),
        }
    }

    async fn run_stages(&self) -> Result<(), SyncError> {
        // Always first: the CVOConfig cannot be stored until its CRD exists
        self.definitions.ensure_definitions().await?;

        let config = self.resolver.resolve().await?;
        let target = config.config_ref();

        self.status
            .publish_condition(&target, &StatusCondition::working(&config))
            .await?;

        let payload = self
            .fetcher
            .fetch(&self.payload_path_prefix, &config)
            .await?;

        self.applier.apply(&config, &payload).await?;

        self.status
            .publish_condition(&target, &StatusCondition::done(&config))
            .await
    }
}

#[async_trait]
impl SyncHandler for SyncPipeline {
    async fn sync(&self, key: &str) -> Result<(), SyncError> {
        let span = tracing::debug_span!("controller.sync", key = %key);
        let start = Instant::now();
        debug!(parent: &span, "Started syncing {}", key);

        let result = self.run_stages().instrument(span.clone()).await;

        let elapsed = start.elapsed();
        observability::metrics::increment_syncs();
        observability::metrics::observe_sync_duration(elapsed.as_secs_f64());
        debug!(parent: &span, "Finished syncing {} ({:?})", key, elapsed);
        result
    }
}
