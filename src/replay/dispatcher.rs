//! Bounded-concurrency dispatcher
//!
//! Submission never waits for a fetch: every task is spawned immediately and
//! queues on a semaphore, so at most `workers` fetches run at once. All
//! tasks belong to one tracker, and [`Dispatcher::drain`] waits for every one
//! of them.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::error;

/// Fixed-size worker pool owning every task it was given
#[derive(Debug)]
pub struct Dispatcher {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    workers: usize,
    submitted: AtomicU64,
}

impl Dispatcher {
    /// Create a pool; zero workers is treated as one
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            tracker: TaskTracker::new(),
            workers,
            submitted: AtomicU64::new(0),
        }
    }

    /// Hand a task to the pool without waiting for it
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        self.submitted.fetch_add(1, Ordering::Relaxed);

        self.tracker.spawn(async move {
            // The semaphore is never closed while tasks are tracked
            let Ok(_permit) = permits.acquire_owned().await else {
                error!("Worker pool closed, task dropped");
                return;
            };
            task.await;
        });
    }

    /// Wait until every submitted task has finished
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Tasks submitted and not yet finished
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Tasks submitted so far
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_all_tasks() {
        let dispatcher = Dispatcher::new(2);
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let done = done.clone();
            dispatcher.submit(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        dispatcher.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(dispatcher.submitted(), 10);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrency_bounded() {
        let dispatcher = Dispatcher::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let running = running.clone();
            let peak = peak.clone();
            dispatcher.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }

        dispatcher.drain().await;
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_submit_does_not_block() {
        let dispatcher = Dispatcher::new(1);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        // First task holds the only worker until released
        dispatcher.submit(async move {
            let _ = rx.await;
        });
        dispatcher.submit(async {});
        assert_eq!(dispatcher.submitted(), 2);

        tx.send(()).unwrap();
        dispatcher.drain().await;
    }

    #[tokio::test]
    async fn test_zero_workers_is_one() {
        let dispatcher = Dispatcher::new(0);
        assert_eq!(dispatcher.workers(), 1);
        dispatcher.drain().await;
    }
}
