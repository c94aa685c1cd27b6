//! LeaseGuard - ワーカー lease の RAII ガード
//!
//! # 設計原則
//! - acquire に成功したら release はちょうど 1 回（冪等なので重複は無害）
//! - 通常経路は `release().await` で明示的に返す
//! - panic や future の drop で明示 release を通らなかった場合は、
//!   Drop で現在の runtime に release を spawn する

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{error, warn};

use crate::domain::errors::DispatchError;
use crate::domain::ids::{JobId, WorkerAddress};
use crate::ports::WorkerPool;

/// Exclusive hold of one worker by one dispatch attempt.
#[must_use = "a lease must be released"]
pub struct LeaseGuard {
    pool: Arc<dyn WorkerPool>,
    worker: WorkerAddress,
    job_id: JobId,
    released: bool,
}

impl LeaseGuard {
    pub async fn acquire(pool: Arc<dyn WorkerPool>, job_id: &JobId) -> Result<Self, DispatchError> {
        let worker = pool.acquire().await?;
        Ok(Self {
            pool,
            worker,
            job_id: job_id.clone(),
            released: false,
        })
    }

    pub fn worker(&self) -> &WorkerAddress {
        &self.worker
    }

    /// Return the worker to the pool and hand back its address.
    pub async fn release(mut self) -> WorkerAddress {
        self.pool.release(&self.worker).await;
        self.released = true;
        self.worker.clone()
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                warn!(
                    job_id = %self.job_id,
                    worker = %self.worker,
                    "lease dropped without release; releasing in background"
                );
                let pool = Arc::clone(&self.pool);
                let worker = self.worker.clone();
                handle.spawn(async move {
                    pool.release(&worker).await;
                });
            }
            Err(_) => {
                error!(
                    job_id = %self.job_id,
                    worker = %self.worker,
                    "lease dropped outside a runtime; worker was not returned"
                );
            }
        }
    }
}
