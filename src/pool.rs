//! Bounded pool for blocking work.
//!
//! The search backend client is synchronous. Every call into it goes through
//! [`WorkerPool::submit`], which waits for one of `capacity` slots and then runs
//! the closure on tokio's blocking threads, so request handlers only ever
//! suspend and never block.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info};

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool capacity must be a positive integer")]
    ZeroCapacity,
    #[error("worker pool is shut down")]
    ShutDown,
    #[error("worker panicked: {0}")]
    Panicked(String),
}

#[derive(Clone, Debug)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    capacity: usize,
    slots: Arc<Semaphore>,
    closed: AtomicBool,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        let capacity = capacity.min(Semaphore::MAX_PERMITS).min(u32::MAX as usize);
        info!("Worker pool started with {} workers", capacity);
        Ok(Self {
            inner: Arc::new(Inner {
                capacity,
                slots: Arc::new(Semaphore::new(capacity)),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of idle workers right now.
    pub fn available(&self) -> usize {
        self.inner.slots.available_permits()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Run `job` on a worker and wait for its return value.
    ///
    /// Excess submissions wait in FIFO order for a free worker; there is no
    /// queue limit. Once the job has a worker it runs to completion even if the
    /// returned future is dropped.
    pub async fn submit<F, T>(&self, job: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }
        let permit = Arc::clone(&self.inner.slots)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::ShutDown)?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        match handle.await {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => {
                let payload = e.into_panic();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(PoolError::Panicked(message))
            }
            Err(_) => Err(PoolError::ShutDown),
        }
    }

    /// Stop admitting work, then wait for every queued and running job.
    ///
    /// Waiters on the semaphore are served in order, so acquiring every permit
    /// only succeeds after all work submitted before this call has finished.
    pub async fn shutdown(&self) -> Result<(), PoolError> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Err(PoolError::ShutDown);
        }
        debug!("Draining worker pool");
        let all = self.inner.capacity as u32;
        let drained = self
            .inner
            .slots
            .acquire_many(all)
            .await
            .map_err(|_| PoolError::ShutDown)?;
        drained.forget();
        self.inner.slots.close();
        info!("Worker pool shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(WorkerPool::new(0).unwrap_err(), PoolError::ZeroCapacity);
    }

    #[tokio::test]
    async fn test_submit_returns_value() {
        let pool = WorkerPool::new(2).unwrap();
        let value = pool.submit(|| 21 * 2).await;
        assert_eq!(assert_ok!(value), 42);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_job_error_propagates_unchanged() {
        let pool = WorkerPool::new(1).unwrap();
        let result: Result<Result<(), String>, PoolError> =
            pool.submit(|| Err("backend exploded".to_string())).await;
        assert_eq!(result.unwrap(), Err("backend exploded".to_string()));
    }

    #[tokio::test]
    async fn test_panic_does_not_poison_pool() {
        let pool = WorkerPool::new(1).unwrap();
        let result = pool.submit(|| -> u8 { panic!("boom") }).await;
        assert_eq!(result.unwrap_err(), PoolError::Panicked("boom".to_string()));

        // The only worker slot is free again
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.submit(|| 7).await.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_saturated_pool_queues_instead_of_rejecting() {
        let capacity = 3;
        let pool = WorkerPool::new(capacity).unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(std::sync::Mutex::new(release_rx));
        let started = Arc::new(AtomicUsize::new(0));

        let mut blockers = Vec::new();
        for _ in 0..capacity {
            let pool = pool.clone();
            let rx = Arc::clone(&release_rx);
            let started = Arc::clone(&started);
            blockers.push(tokio::spawn(async move {
                pool.submit(move || {
                    started.fetch_add(1, Ordering::SeqCst);
                    rx.lock().unwrap().recv().unwrap();
                })
                .await
            }));
        }
        while started.load(Ordering::SeqCst) < capacity {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(pool.available(), 0);

        let extra = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.submit(|| "extra").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!extra.is_finished(), "N+1th job must wait for a free worker");

        release_tx.send(()).unwrap();
        assert_eq!(extra.await.unwrap().unwrap(), "extra");

        for _ in 1..capacity {
            release_tx.send(()).unwrap();
        }
        for blocker in futures::future::join_all(blockers).await {
            assert_ok!(blocker.unwrap());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_waits_for_pending_work() {
        let pool = WorkerPool::new(1).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        let mut jobs = Vec::new();
        for _ in 0..3 {
            let pool = pool.clone();
            let done = Arc::clone(&done);
            jobs.push(tokio::spawn(async move {
                pool.submit(move || {
                    std::thread::sleep(Duration::from_millis(20));
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        // Let every submission reach the queue before closing admission
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_ok!(pool.shutdown().await);
        assert_eq!(done.load(Ordering::SeqCst), 3);
        for job in jobs {
            assert_ok!(job.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(4).unwrap();
        assert_ok!(pool.shutdown().await);
        assert!(pool.is_shut_down());
        assert_eq!(pool.submit(|| 1).await.unwrap_err(), PoolError::ShutDown);
        assert_err!(pool.shutdown().await);
    }
}
