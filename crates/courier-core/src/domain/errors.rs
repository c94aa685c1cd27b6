//! Errors - エラー型と分類
//!
//! courier はリトライを決めません。失敗はすべて型付きで呼び出し元
//! （外部キュー）に返し、`ErrorKind` を見てキュー側が再試行を判断します。

use std::time::Duration;

use thiserror::Error;

use super::category::JobCategory;
use super::ids::{JobId, ProjectId, WorkerAddress};

/// ErrorKind は dispatch エラーの分類
///
/// - Transient: 一時的なエラー（リトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
/// - Infrastructure: インフラエラー（ワーカー接続、トークン発行などの障害）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// DispatchError は 1 回の dispatch 試行の失敗
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Pool exhausted and nothing was released within the wait bound.
    #[error("no worker available after waiting {waited:?}")]
    NoWorkerAvailable { waited: Duration },

    /// The worker did not acknowledge within the lock duration.
    #[error("job {job_id} was not acknowledged within {after:?}")]
    DispatchTimeout { job_id: JobId, after: Duration },

    /// The worker reported a failure. Displays the worker's message verbatim.
    #[error("{message}")]
    WorkerInternalError { message: String },

    #[error("worker {0} is not connected")]
    WorkerDisconnected(WorkerAddress),

    #[error("category {declared} does not match payload category {actual}")]
    CategoryMismatch {
        declared: JobCategory,
        actual: JobCategory,
    },

    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    #[error("failed to issue credential: {0}")]
    TokenIssuance(String),

    /// Anything unexpected while leasing, dispatching or classifying.
    #[error("unclassified dispatch fault: {0}")]
    Unclassified(String),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::NoWorkerAvailable { .. }
            | DispatchError::DispatchTimeout { .. }
            | DispatchError::WorkerInternalError { .. } => ErrorKind::Transient,
            DispatchError::CategoryMismatch { .. }
            | DispatchError::ProjectNotFound(_) => ErrorKind::Permanent,
            DispatchError::WorkerDisconnected(_)
            | DispatchError::TokenIssuance(_)
            | DispatchError::Unclassified(_) => ErrorKind::Infrastructure,
        }
    }

    /// Permanent errors will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind() != ErrorKind::Permanent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn worker_message_is_displayed_verbatim() {
        let err = DispatchError::WorkerInternalError {
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "boom");
    }

    #[rstest]
    #[case::no_worker(DispatchError::NoWorkerAvailable { waited: Duration::from_secs(1) }, ErrorKind::Transient)]
    #[case::timeout(DispatchError::DispatchTimeout { job_id: JobId::new("j"), after: Duration::from_secs(90) }, ErrorKind::Transient)]
    #[case::mismatch(DispatchError::CategoryMismatch { declared: JobCategory::Webhook, actual: JobCategory::Agent }, ErrorKind::Permanent)]
    #[case::project_not_found(DispatchError::ProjectNotFound(ProjectId::new("p")), ErrorKind::Permanent)]
    #[case::disconnected(DispatchError::WorkerDisconnected(WorkerAddress::new("w")), ErrorKind::Infrastructure)]
    fn errors_are_classified(#[case] err: DispatchError, #[case] expected: ErrorKind) {
        assert_eq!(err.kind(), expected);
        assert_eq!(err.is_retryable(), expected != ErrorKind::Permanent);
    }
}
