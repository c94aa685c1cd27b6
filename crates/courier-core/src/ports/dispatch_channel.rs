//! DispatchChannel port - ワーカーへの request / ack
//!
//! # 設計原則
//! - 配送は 1 回だけ試みる（リトライはキュー側の判断）
//! - ack か timeout の早い方で戻る
//! - timeout 後に届いた ack は捨てる
//! - 複数ワーカー宛ての request を同時に多重化できること

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::DispatchError;
use crate::domain::ids::WorkerAddress;
use crate::domain::wire::{DispatchRequest, DispatchResponse};

/// Result of one request/ack round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendResult {
    /// The worker acknowledged. Exactly one response is expected.
    Acknowledged(Vec<DispatchResponse>),
    /// No acknowledgment arrived before the deadline.
    TimedOut,
}

#[async_trait]
pub trait DispatchChannel: Send + Sync {
    async fn send(
        &self,
        worker: &WorkerAddress,
        request: DispatchRequest,
        timeout: Duration,
    ) -> Result<SendResult, DispatchError>;
}
