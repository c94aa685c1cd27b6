//! WorkerPool port - 実行ワーカーの貸し出し（lease）
//!
//! # 設計原則
//! - acquire 済みのアドレスは release されるまで他の呼び出しに渡さない
//! - release は冪等（未貸し出しのアドレスは無視）
//! - 分散構成では共有レジストリで実装する（このクレートの範囲外）

use async_trait::async_trait;

use crate::domain::errors::DispatchError;
use crate::domain::ids::WorkerAddress;

#[async_trait]
pub trait WorkerPool: Send + Sync {
    /// Lease a free worker, waiting within the pool's own bound.
    ///
    /// Fails with [`DispatchError::NoWorkerAvailable`] when nothing frees up.
    async fn acquire(&self) -> Result<WorkerAddress, DispatchError>;

    /// Return a leased worker. Releasing an address that is not leased is a no-op.
    async fn release(&self, worker: &WorkerAddress);
}
