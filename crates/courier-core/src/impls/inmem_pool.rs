//! InMemoryWorkerPool - プロセス内のワーカープール
//!
//! # 実装詳細
//! - available（VecDeque）と leased（HashSet）を Mutex で保護
//! - release / register 時に Notify で待機中の acquire を起こす
//! - acquire の待ち時間は `acquire_timeout` で上限を設定（None は無制限）

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::errors::DispatchError;
use crate::domain::ids::WorkerAddress;
use crate::ports::WorkerPool;

/// Snapshot of the pool for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounts {
    pub available: usize,
    pub leased: usize,
}

#[derive(Default)]
struct PoolState {
    available: VecDeque<WorkerAddress>,
    leased: HashSet<WorkerAddress>,
    /// Leased workers that left the pool; dropped instead of returned on release.
    retired: HashSet<WorkerAddress>,
}

impl PoolState {
    fn is_known(&self, worker: &WorkerAddress) -> bool {
        self.leased.contains(worker) || self.available.contains(worker)
    }
}

pub struct InMemoryWorkerPool {
    state: Mutex<PoolState>,
    notify: Notify,
    acquire_timeout: Option<Duration>,
}

impl InMemoryWorkerPool {
    pub fn new(acquire_timeout: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            notify: Notify::new(),
            acquire_timeout,
        }
    }

    /// Pool pre-filled with `workers`, duplicates ignored.
    pub fn with_workers<I>(workers: I, acquire_timeout: Option<Duration>) -> Self
    where
        I: IntoIterator<Item = WorkerAddress>,
    {
        let mut state = PoolState::default();
        for worker in workers {
            if !state.is_known(&worker) {
                state.available.push_back(worker);
            }
        }
        Self {
            state: Mutex::new(state),
            notify: Notify::new(),
            acquire_timeout,
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }

    /// Add a worker to the pool. Re-registering a known worker is a no-op,
    /// except that a leased worker pending retirement is kept after all.
    pub async fn register(&self, worker: WorkerAddress) {
        {
            let mut state = self.state.lock().await;
            if state.retired.remove(&worker) || state.is_known(&worker) {
                return;
            }
            debug!(worker = %worker, "worker registered");
            state.available.push_back(worker);
        }
        self.notify.notify_one();
    }

    /// Remove a worker. A leased worker finishes its current job and is
    /// dropped when released.
    pub async fn deregister(&self, worker: &WorkerAddress) {
        let mut state = self.state.lock().await;
        if state.leased.contains(worker) {
            state.retired.insert(worker.clone());
            debug!(worker = %worker, "leased worker retired");
        } else {
            state.available.retain(|w| w != worker);
            debug!(worker = %worker, "worker deregistered");
        }
    }

    pub async fn counts(&self) -> PoolCounts {
        let state = self.state.lock().await;
        PoolCounts {
            available: state.available.len(),
            leased: state.leased.len(),
        }
    }
}

#[async_trait]
impl WorkerPool for InMemoryWorkerPool {
    async fn acquire(&self) -> Result<WorkerAddress, DispatchError> {
        let deadline = self.acquire_timeout.map(|limit| Instant::now() + limit);
        loop {
            // 状態を見る前に待機登録しておく（release の通知を取りこぼさない）
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(worker) = state.available.pop_front() {
                    state.leased.insert(worker.clone());
                    return Ok(worker);
                }
            }

            match (deadline, self.acquire_timeout) {
                (Some(deadline), Some(limit)) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        warn!(waited = ?limit, "no worker became available");
                        return Err(DispatchError::NoWorkerAvailable { waited: limit });
                    }
                }
                _ => notified.await,
            }
        }
    }

    async fn release(&self, worker: &WorkerAddress) {
        {
            let mut state = self.state.lock().await;
            if !state.leased.remove(worker) {
                debug!(worker = %worker, "release ignored: worker not leased");
                return;
            }
            if state.retired.remove(worker) {
                debug!(worker = %worker, "retired worker dropped on release");
                return;
            }
            state.available.push_back(worker.clone());
        }
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pool(n: usize, acquire_timeout: Option<Duration>) -> InMemoryWorkerPool {
        InMemoryWorkerPool::with_workers(
            (0..n).map(|i| WorkerAddress::new(format!("w{i}"))),
            acquire_timeout,
        )
    }

    #[tokio::test]
    async fn acquire_hands_out_distinct_workers() {
        let pool = pool(2, Some(Duration::from_millis(10)));

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_ne!(a, b);

        let counts = pool.counts().await;
        assert_eq!(counts, PoolCounts { available: 0, leased: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_fails_after_wait_bound() {
        let pool = pool(1, Some(Duration::from_secs(3)));
        let _held = pool.acquire().await.unwrap();

        let start = Instant::now();
        let err = pool.acquire().await.unwrap_err();

        assert!(matches!(err, DispatchError::NoWorkerAvailable { waited } if Some(waited) == pool.acquire_timeout()));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(3) + Duration::from_millis(5));
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let pool = pool(1, None);
        let worker = pool.acquire().await.unwrap();

        pool.release(&worker).await;
        pool.release(&worker).await;
        pool.release(&WorkerAddress::new("stranger")).await;

        assert_eq!(pool.counts().await, PoolCounts { available: 1, leased: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn release_wakes_a_waiting_acquire() {
        let pool = Arc::new(pool(1, None));
        let worker = pool.acquire().await.unwrap();

        let waiter = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.acquire().await.unwrap() }
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!waiter.is_finished());

        pool.release(&worker).await;
        let next = waiter.await.unwrap();
        assert_eq!(next, worker);
    }

    #[tokio::test]
    async fn register_wakes_a_waiting_acquire() {
        let pool = Arc::new(InMemoryWorkerPool::new(None));

        let waiter = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.acquire().await.unwrap() }
        });

        tokio::task::yield_now().await;
        pool.register(WorkerAddress::new("late")).await;

        assert_eq!(waiter.await.unwrap(), WorkerAddress::new("late"));
    }

    #[tokio::test]
    async fn deregistered_leased_worker_is_not_returned() {
        let pool = pool(1, Some(Duration::from_millis(10)));
        let worker = pool.acquire().await.unwrap();

        pool.deregister(&worker).await;
        pool.release(&worker).await;

        assert_eq!(pool.counts().await, PoolCounts { available: 0, leased: 0 });
    }

    #[tokio::test]
    async fn duplicate_registration_is_ignored() {
        let pool = pool(1, None);
        pool.register(WorkerAddress::new("w0")).await;

        assert_eq!(pool.counts().await.available, 1);
    }
}
