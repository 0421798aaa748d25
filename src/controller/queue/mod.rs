//! # Work Queue
//!
//! Deduplicating, rate-limited work queue. It is the only scheduling primitive:
//! watch events add keys, workers get them, and failures are requeued through
//! the rate limiter.
//!
//! Guarantees:
//! - A key is queued at most once no matter how many times it is added (coalescing).
//! - A key is handed to at most one worker at a time. Adding it while it is being
//!   processed marks it dirty; `done` then queues it exactly once more.
//! - After `shut_down`, queued keys are still handed out; `get` returns `None`
//!   once the queue is empty.

mod rate_limiter;

pub use rate_limiter::{ExponentialFailureRateLimiter, RateLimiter};

use crate::observability;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::trace;

#[derive(Debug)]
struct QueueState<K> {
    /// Keys waiting to be handed out, in order
    queue: VecDeque<K>,
    /// Keys that need processing (queued, or re-added while processing)
    dirty: HashSet<K>,
    /// Keys currently held by a worker
    processing: HashSet<K>,
    shutting_down: bool,
}

struct Inner<K> {
    name: String,
    state: Mutex<QueueState<K>>,
    notify: Notify,
    limiter: Box<dyn RateLimiter<K>>,
}

/// Cloneable handle to a shared rate-limited work queue
pub struct WorkQueue<K> {
    inner: Arc<Inner<K>>,
}

impl<K> Clone for WorkQueue<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> fmt::Debug for WorkQueue<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("WorkQueue")
            .field("name", &self.inner.name)
            .field("queued", &state.queue)
            .field("processing", &state.processing)
            .field("shutting_down", &state.shutting_down)
            .finish()
    }
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, limiter: impl RateLimiter<K> + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    dirty: HashSet::new(),
                    processing: HashSet::new(),
                    shutting_down: false,
                }),
                notify: Notify::new(),
                limiter: Box::new(limiter),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState<K>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Mark `item` as needing processing
    ///
    /// No-op if it is already queued. If it is being processed it is queued again
    /// when the worker calls `done`. Ignored after shutdown.
    pub fn add(&self, item: K) {
        let mut state = self.state();
        if state.shutting_down {
            return;
        }
        if !state.dirty.insert(item.clone()) {
            trace!("{:?} already pending in queue {}", item, self.inner.name);
            return;
        }
        observability::metrics::increment_workqueue_adds(&self.inner.name);
        if state.processing.contains(&item) {
            return;
        }
        state.queue.push_back(item);
        observability::metrics::set_workqueue_depth(&self.inner.name, state.queue.len());
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Add `item` once `delay` has elapsed
    ///
    /// Must be called from within a Tokio runtime when `delay` is non-zero.
    pub fn add_after(&self, item: K, delay: Duration) {
        if self.is_shutting_down() {
            return;
        }
        if delay.is_zero() {
            self.add(item);
            return;
        }
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item);
        });
    }

    /// Requeue `item` after the rate limiter's backoff for it
    ///
    /// Ignored after shutdown without recording a failure for `item`.
    pub fn add_rate_limited(&self, item: K) {
        if self.is_shutting_down() {
            trace!("Queue {} shutting down, not requeueing {:?}", self.inner.name, item);
            return;
        }
        let delay = self.inner.limiter.when(&item);
        observability::metrics::increment_workqueue_retries(&self.inner.name);
        trace!("Requeueing {:?} in {:?}", item, delay);
        self.add_after(item, delay);
    }

    /// Clear retry bookkeeping for `item`
    pub fn forget(&self, item: &K) {
        self.inner.limiter.forget(item);
    }

    /// Failures recorded for `item` since it was last forgotten
    pub fn num_requeues(&self, item: &K) -> u32 {
        self.inner.limiter.num_requeues(item)
    }

    /// Wait for the next key and mark it as being processed
    ///
    /// # Returns
    ///
    /// * `Some(key)` - the key, now in the processing set until [`WorkQueue::done`]
    /// * `None` - the queue is shut down and empty; the worker should exit
    pub async fn get(&self) -> Option<K> {
        loop {
            // Register interest before inspecting state so an add or shutdown
            // between the check and the await still wakes us
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    observability::metrics::set_workqueue_depth(
                        &self.inner.name,
                        state.queue.len(),
                    );
                    return Some(item);
                }
                if state.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Mark `item` as no longer being processed
    ///
    /// If it was added again while being processed it is queued now.
    pub fn done(&self, item: &K) {
        let mut state = self.state();
        state.processing.remove(item);
        if !state.dirty.contains(item) {
            return;
        }
        state.queue.push_back(item.clone());
        observability::metrics::set_workqueue_depth(&self.inner.name, state.queue.len());
        drop(state);
        self.inner.notify.notify_one();
    }

    /// Stop accepting new keys and wake every waiting `get`
    pub fn shut_down(&self) {
        self.state().shutting_down = true;
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }

    /// Number of keys waiting to be handed out
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    const KEY: &str = "kube-system/installconfig";

    fn queue() -> WorkQueue<String> {
        WorkQueue::new(
            "test",
            ExponentialFailureRateLimiter::default(),
        )
    }

    #[tokio::test]
    async fn test_add_coalesces_duplicates() {
        let queue = queue();
        for _ in 0..5 {
            queue.add(KEY.to_string());
        }

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await, Some(KEY.to_string()));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_add_while_processing_schedules_one_follow_up() {
        let queue = queue();
        queue.add(KEY.to_string());
        let key = queue.get().await.unwrap();

        queue.add(KEY.to_string());
        queue.add(KEY.to_string());
        // Not handed out while a worker holds it
        assert_eq!(queue.len(), 0);

        queue.done(&key);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await, Some(KEY.to_string()));
        queue.done(&key);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_done_without_readd_leaves_queue_empty() {
        let queue = queue();
        queue.add(KEY.to_string());
        let key = queue.get().await.unwrap();
        queue.done(&key);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_keys_handed_out_in_order() {
        let queue = queue();
        queue.add("a".to_string());
        queue.add("b".to_string());
        queue.add("a".to_string());

        assert_eq!(queue.get().await, Some("a".to_string()));
        assert_eq!(queue.get().await, Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_get_waits_for_add() {
        let queue = queue();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        queue.add(KEY.to_string());

        assert_eq!(waiter.await.unwrap(), Some(KEY.to_string()));
    }

    #[tokio::test]
    async fn test_shut_down_drains_then_signals() {
        let queue = queue();
        queue.add(KEY.to_string());
        queue.shut_down();
        queue.add("late".to_string());

        assert_eq!(queue.get().await, Some(KEY.to_string()));
        assert_eq!(queue.get().await, None);
    }

    #[tokio::test]
    async fn test_shut_down_wakes_waiting_workers() {
        let queue = queue();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.get().await })
            })
            .collect();
        tokio::task::yield_now().await;

        queue.shut_down();

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_rate_limited_waits_for_backoff() {
        let queue = queue();
        let key = KEY.to_string();

        for attempt in 0..4u32 {
            let start = Instant::now();
            queue.add_rate_limited(key.clone());
            assert!(queue.is_empty());

            let got = queue.get().await.unwrap();
            queue.done(&got);

            assert!(start.elapsed() >= Duration::from_millis(5) * 2u32.pow(attempt));
        }
        assert_eq!(queue.num_requeues(&key), 4);

        queue.forget(&key);
        assert_eq!(queue.num_requeues(&key), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_after_ignored_once_shut_down() {
        let queue = queue();
        queue.add_after(KEY.to_string(), Duration::from_millis(50));
        queue.shut_down();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(queue.is_empty());
        assert_eq!(queue.get().await, None);
    }

    #[tokio::test]
    async fn test_add_rate_limited_during_shutdown_records_no_failure() {
        let queue = queue();
        let key = KEY.to_string();
        queue.add_rate_limited(key.clone());
        assert_eq!(queue.num_requeues(&key), 1);

        queue.shut_down();
        queue.add_rate_limited(key.clone());

        assert_eq!(queue.num_requeues(&key), 1);
    }
}
