//! Events - ドメインイベント
//!
//! JobConsumer が各ステップで EventSink に流します。
//! 記録先（ログ、メトリクス、テスト用バッファ）は EventSink 側の責務です。

use std::time::Duration;

use super::category::JobCategory;
use super::errors::ErrorKind;
use super::ids::{JobId, RequestId, WorkerAddress};

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    JobSkipped {
        job_id: JobId,
        category: JobCategory,
        reason: Option<String>,
    },
    WorkerLeased {
        job_id: JobId,
        worker: WorkerAddress,
    },
    JobDispatched {
        job_id: JobId,
        worker: WorkerAddress,
        request_id: RequestId,
        lock_duration: Duration,
    },
    JobCompleted {
        job_id: JobId,
        worker: WorkerAddress,
    },
    JobFailed {
        job_id: JobId,
        kind: ErrorKind,
        error: String,
    },
    WorkerReleased {
        job_id: JobId,
        worker: WorkerAddress,
    },
}

impl DomainEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            DomainEvent::JobSkipped { job_id, .. }
            | DomainEvent::WorkerLeased { job_id, .. }
            | DomainEvent::JobDispatched { job_id, .. }
            | DomainEvent::JobCompleted { job_id, .. }
            | DomainEvent::JobFailed { job_id, .. }
            | DomainEvent::WorkerReleased { job_id, .. } => job_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::JobSkipped { .. } => "job_skipped",
            DomainEvent::WorkerLeased { .. } => "worker_leased",
            DomainEvent::JobDispatched { .. } => "job_dispatched",
            DomainEvent::JobCompleted { .. } => "job_completed",
            DomainEvent::JobFailed { .. } => "job_failed",
            DomainEvent::WorkerReleased { .. } => "worker_released",
        }
    }
}
