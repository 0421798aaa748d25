//! # Rate Limiters
//!
//! Per-item retry delay bookkeeping for the work queue.

use crate::constants::{DEFAULT_QUEUE_BASE_DELAY, DEFAULT_QUEUE_MAX_DELAY};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Decides how long an item waits before it is requeued after a failure
pub trait RateLimiter<K>: Send + Sync {
    /// Delay before `item` is retried; records one more failure
    fn when(&self, item: &K) -> Duration;
    /// Clear all failure history for `item`
    fn forget(&self, item: &K);
    /// Number of failures recorded for `item` since it was last forgotten
    fn num_requeues(&self, item: &K) -> u32;
}

/// `base_delay * 2^failures`, capped at `max_delay`
#[derive(Debug)]
pub struct ExponentialFailureRateLimiter<K> {
    base_delay: Duration,
    max_delay: Duration,
    failures: Mutex<HashMap<K, u32>>,
}

impl<K> ExponentialFailureRateLimiter<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            failures: Mutex::new(HashMap::new()),
        }
    }

    fn failures(&self) -> MutexGuard<'_, HashMap<K, u32>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delay for the n-th consecutive failure (0-indexed)
    ///
    /// # Arguments
    ///
    /// * `failures` - Consecutive failures recorded before this retry
    ///
    /// # Returns
    ///
    /// `base_delay * 2^failures`, or `max_delay` once that product reaches the
    /// ceiling or overflows
    pub fn backoff_for(&self, failures: u32) -> Duration {
        2u32.checked_pow(failures)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl<K> Default for ExponentialFailureRateLimiter<K>
where
    K: Eq + Hash + Clone,
{
    /// 5ms base delay, 1000s ceiling
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_BASE_DELAY, DEFAULT_QUEUE_MAX_DELAY)
    }
}

impl<K> RateLimiter<K> for ExponentialFailureRateLimiter<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn when(&self, item: &K) -> Duration {
        let mut failures = self.failures();
        let count = failures.entry(item.clone()).or_insert(0);
        let previous = *count;
        *count = count.saturating_add(1);
        self.backoff_for(previous)
    }

    fn forget(&self, item: &K) {
        self.failures().remove(item);
    }

    fn num_requeues(&self, item: &K) -> u32 {
        self.failures().get(item).copied().unwrap_or(0)
    }
}
