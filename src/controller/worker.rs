//! # Worker Loop
//!
//! Workers pull one key at a time, run the sync handler and feed the result into
//! the retry policy:
//!
//! - success: forget the key's retry history
//! - failure below the retry budget: requeue with backoff (expected, logged at debug)
//! - failure at the retry budget: publish Degraded, log the error, forget the key.
//!   The key then stays out of the queue until the next watch event.

use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::{ConfigRef, StatusCondition, SyncError, SyncHandler};
use crate::controller::WorkKey;
use crate::observability;
use crate::provider::StatusSink;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// When to stop retrying a failing key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Requeues allowed before the key is dropped and reported as Degraded
    pub max_retries: u32,
    /// Report validation failures as Degraded without climbing the retry ladder
    pub fail_fast_on_validation: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::constants::DEFAULT_MAX_RETRIES,
            fail_fast_on_validation: false,
        }
    }
}

/// Runs workers over the work queue
pub struct Controller {
    queue: WorkQueue<WorkKey>,
    handler: Arc<dyn SyncHandler>,
    status: Arc<dyn StatusSink>,
    /// Where Degraded is published
    target: ConfigRef,
    policy: RetryPolicy,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("queue", &self.queue)
            .field("target", &self.target)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(
        queue: WorkQueue<WorkKey>,
        handler: Arc<dyn SyncHandler>,
        status: Arc<dyn StatusSink>,
        target: ConfigRef,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            queue,
            handler,
            status,
            target,
            policy,
        }
    }

    pub fn queue(&self) -> &WorkQueue<WorkKey> {
        &self.queue
    }

    /// Run `workers` workers until `shutdown` resolves
    ///
    /// # Arguments
    ///
    /// * `workers` - number of concurrent worker tasks
    /// * `shutdown` - future that resolves on SIGINT/SIGTERM
    ///
    /// On shutdown the queue stops accepting keys; in-flight syncs run to
    /// completion and already-queued keys are drained before workers exit.
    pub async fn run<F>(self: Arc<Self>, workers: usize, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let workers = workers.max(1);
        info!("Starting cluster version controller with {} worker(s)", workers);

        let mut tasks = JoinSet::new();
        for id in 0..workers {
            let controller = Arc::clone(&self);
            tasks.spawn(async move { controller.worker(id).await });
        }

        shutdown.await;
        info!("Shutting down cluster version controller");
        self.queue.shut_down();

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Worker task failed: {}", e);
            }
        }
        info!("All workers stopped");
    }

    async fn worker(&self, id: usize) {
        debug!("Worker {} started", id);
        while self.process_next_work_item().await {}
        debug!("Worker {} exiting", id);
    }

    /// Process one key. Returns `false` once the queue has shut down.
    pub async fn process_next_work_item(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        let result = self.handler.sync(&key).await;
        self.queue.done(&key);
        self.handle_err(&key, result).await;

        true
    }

    async fn handle_err(&self, key: &WorkKey, result: Result<(), SyncError>) {
        let err = match result {
            Ok(()) => {
                self.queue.forget(key);
                return;
            }
            Err(err) => err,
        };

        observability::metrics::increment_sync_errors(err.kind());
        let requeues = self.queue.num_requeues(key);
        let fail_fast = self.policy.fail_fast_on_validation && err.is_validation();

        if requeues < self.policy.max_retries && !fail_fast {
            debug!("Error syncing {} (requeue {}): {}", key, requeues, err);
            observability::metrics::increment_requeues_total("error-backoff");
            self.queue.add_rate_limited(key.clone());
            return;
        }

        self.sync_degraded_status(&err).await;
        error!(
            key = %key,
            stage = %err.stage(),
            requeues,
            "Dropping {} out of the queue: {}",
            key,
            err
        );
        observability::metrics::increment_degraded();
        self.queue.forget(key);
    }

    async fn sync_degraded_status(&self, err: &SyncError) {
        let condition = StatusCondition::degraded(err);
        if let Err(publish_err) = self.status.publish_condition(&self.target, &condition).await {
            error!(
                "Failed to publish Degraded condition for {}: {}",
                self.target, publish_err
            );
        }
    }
}
