//! Bounded task pool used for playlist fan-out and part downloads.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

/// Bound used when the pool is created without a limit.
pub const UNBOUNDED: u32 = i32::MAX as u32;

/// Caps how many tasks hold a slot at the same time.
///
/// Each unit of work takes a [`PoolPermit`] from [`TaskPool::acquire`] and
/// keeps it until it finishes. The slot is given back when the permit is
/// dropped, so early returns, errors and panics all release it exactly once.
/// [`TaskPool::wait`] blocks until every outstanding permit is back.
///
/// The pool is cheap to clone; clones share the same slots.
#[derive(Debug, Clone)]
pub struct TaskPool {
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Total number of slots.
    bound: u32,
}

/// A held pool slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
}

impl TaskPool {
    /// Create a pool that runs at most `max_concurrent` tasks at once.
    ///
    /// `0` means no practical limit.
    pub fn new(max_concurrent: usize) -> Self {
        let bound = match max_concurrent {
            0 => UNBOUNDED,
            n => u32::try_from(n).unwrap_or(UNBOUNDED).min(UNBOUNDED),
        };
        Self {
            semaphore: Arc::new(Semaphore::new(bound as usize)),
            bound,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> PoolPermit {
        let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
            unreachable!("task pool semaphore is never closed");
        };
        trace!(in_flight = self.in_flight(), "Pool slot acquired");
        PoolPermit { _permit: permit }
    }

    /// Wait until every acquired slot has been released.
    pub async fn wait(&self) {
        let Ok(all) = self.semaphore.acquire_many(self.bound).await else {
            unreachable!("task pool semaphore is never closed");
        };
        drop(all);
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        (self.bound as usize).saturating_sub(self.semaphore.available_permits())
    }

    pub fn capacity(&self) -> usize {
        self.bound as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::task::JoinSet;

    #[test]
    fn test_zero_means_unbounded() {
        assert_eq!(TaskPool::new(0).capacity(), i32::MAX as usize);
        assert_eq!(TaskPool::new(4).capacity(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bound_is_respected() {
        let pool = TaskPool::new(10);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for i in 0..100u64 {
            let permit = pool.acquire().await;
            let current = current.clone();
            let peak = peak.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(i % 5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            });
        }

        pool.wait().await;
        assert!(peak.load(Ordering::SeqCst) <= 10);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(pool.in_flight(), 0);
        while tasks.join_next().await.is_some() {}
    }

    #[tokio::test]
    async fn test_wait_blocks_until_released() {
        let pool = TaskPool::new(2);
        let finished = Arc::new(AtomicBool::new(false));

        let permit = pool.acquire().await;
        let flag = finished.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
            drop(permit);
        });

        pool.wait().await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_wait_on_idle_pool_returns() {
        TaskPool::new(3).wait().await;
        TaskPool::new(0).wait().await;
    }

    #[tokio::test]
    async fn test_permit_released_on_panic() {
        let pool = TaskPool::new(1);
        let permit = pool.acquire().await;
        let handle = tokio::spawn(async move {
            let _permit = permit;
            panic!("boom");
        });
        assert!(handle.await.is_err());
        assert_eq!(pool.in_flight(), 0);

        let _again = pool.acquire().await;
        assert_eq!(pool.in_flight(), 1);
    }
}
