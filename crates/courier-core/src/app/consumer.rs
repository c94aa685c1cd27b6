//! JobConsumer - 1 件のジョブを filter → lease → dispatch → classify → release する
//!
//! # フロー
//! 1. カテゴリの filter を実行（skip ならワーカーに触れず成功で返る）
//! 2. project / platform を解決
//! 3. TokenIssuer で credential を発行
//! 4. WorkerPool からワーカーを lease
//! 5. lock duration（raw + 60s）で DispatchChannel に送信し ack を待つ
//! 6. ack を分類
//! 7. どの経路でも lease を返す
//!
//! リトライはしません。失敗は `DispatchError` として呼び出し元に返します。

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, Span, debug, info, trace, warn};

use crate::app::lease::LeaseGuard;
use crate::domain::category::JobCategory;
use crate::domain::errors::DispatchError;
use crate::domain::events::DomainEvent;
use crate::domain::filter::FilterSet;
use crate::domain::ids::{JobId, PlatformId, ProjectId, WorkerAddress};
use crate::domain::job::{JobData, JobEnvelope};
use crate::domain::outcome::ConsumeOutcome;
use crate::domain::state::ConsumeState;
use crate::domain::timeout::TimeoutPolicy;
use crate::domain::wire::{Credential, DispatchRequest, ResponseStatus};
use crate::observability;
use crate::ports::{
    DispatchChannel, EventSink, IdGenerator, ProjectDirectory, SendResult, TokenIssuer, WorkerPool,
};

const UNKNOWN_ERROR: &str = "Unknown error";

/// Project and platform a job runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOwner {
    pub project_id: Option<ProjectId>,
    pub platform_id: PlatformId,
}

/// Dispatches one job attempt to a leased worker.
///
/// `JobConsumer` は `ConsumerBuilder` で組み立てます。内部は `Arc` だけなので
/// 複数タスクから `&self` で同時に呼べます。
pub struct JobConsumer {
    pub(crate) filters: FilterSet,
    pub(crate) timeouts: TimeoutPolicy,
    pub(crate) pool: Arc<dyn WorkerPool>,
    pub(crate) channel: Arc<dyn DispatchChannel>,
    pub(crate) tokens: Arc<dyn TokenIssuer>,
    pub(crate) projects: Arc<dyn ProjectDirectory>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) events: Arc<dyn EventSink>,
}

impl JobConsumer {
    /// Consume one dequeued job attempt.
    ///
    /// `Ok(Skipped)` is a successful no-op; the caller acks the job either way.
    pub async fn consume(
        &self,
        job_id: JobId,
        category: JobCategory,
        data: JobData,
        attempts_started: u32,
    ) -> Result<ConsumeOutcome, DispatchError> {
        match JobEnvelope::new(job_id.clone(), category, data, attempts_started) {
            Ok(envelope) => self.consume_envelope(&envelope).await,
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "rejected malformed job");
                self.fail(&job_id, &err);
                Err(err)
            }
        }
    }

    pub async fn consume_envelope(
        &self,
        envelope: &JobEnvelope,
    ) -> Result<ConsumeOutcome, DispatchError> {
        let span = observability::consume_span(envelope.job_id(), envelope.category());
        let result = self.run(envelope).instrument(span.clone()).await;
        if let Err(err) = &result {
            span.in_scope(|| warn!(kind = ?err.kind(), error = %err, "dispatch failed"));
            self.fail(envelope.job_id(), err);
        }
        result
    }

    /// Lock duration used for `category`: raw budget plus padding.
    pub fn lock_duration(&self, category: JobCategory) -> Duration {
        self.timeouts.lock_duration(category)
    }

    /// Resolve the project and platform a job belongs to.
    ///
    /// Platform-scoped payloads carry both ids. Everything else carries a
    /// project id and the platform is looked up.
    pub async fn resolve_owner(&self, data: &JobData) -> Result<JobOwner, DispatchError> {
        let embedded = match data {
            JobData::UserInteraction {
                job_type,
                project_id,
                platform_id,
                ..
            } if job_type.carries_platform() => Some((project_id, platform_id)),
            JobData::OutgoingWebhook {
                project_id,
                platform_id,
                ..
            } => Some((project_id, platform_id)),
            _ => None,
        };
        if let Some((project_id, platform_id)) = embedded {
            return Ok(JobOwner {
                project_id: project_id.clone(),
                platform_id: platform_id.clone(),
            });
        }

        let project_id = data.project_id().cloned().ok_or_else(|| {
            DispatchError::Unclassified("job payload carries no project id".to_string())
        })?;
        let platform_id = self.projects.platform_id(&project_id).await?;
        Ok(JobOwner {
            project_id: Some(project_id),
            platform_id,
        })
    }

    async fn run(&self, envelope: &JobEnvelope) -> Result<ConsumeOutcome, DispatchError> {
        let job_id = envelope.job_id();

        enter(ConsumeState::Filtering);
        let decision = self
            .filters
            .evaluate(envelope.data(), envelope.attempts_started());
        if decision.should_skip {
            debug!(
                reason = decision.reason.as_deref().unwrap_or("unspecified"),
                attempts_started = envelope.attempts_started(),
                "skipping job"
            );
            self.events.emit(DomainEvent::JobSkipped {
                job_id: job_id.clone(),
                category: envelope.category(),
                reason: decision.reason.clone(),
            });
            enter(ConsumeState::Done);
            return Ok(ConsumeOutcome::Skipped {
                reason: decision.reason,
            });
        }

        enter(ConsumeState::Leasing);
        let owner = self.resolve_owner(envelope.data()).await?;
        let credential = self
            .tokens
            .issue(job_id, owner.project_id.as_ref(), &owner.platform_id)
            .await?;
        let lease = LeaseGuard::acquire(Arc::clone(&self.pool), job_id).await?;
        info!(worker = %lease.worker(), "acquired worker");
        self.events.emit(DomainEvent::WorkerLeased {
            job_id: job_id.clone(),
            worker: lease.worker().clone(),
        });

        let result = self.dispatch(envelope, lease.worker(), credential).await;

        let worker = lease.release().await;
        enter(ConsumeState::Released);
        debug!(worker = %worker, "released worker");
        self.events.emit(DomainEvent::WorkerReleased {
            job_id: job_id.clone(),
            worker: worker.clone(),
        });
        enter(ConsumeState::Done);

        result.map(|()| ConsumeOutcome::Completed { worker })
    }

    async fn dispatch(
        &self,
        envelope: &JobEnvelope,
        worker: &WorkerAddress,
        credential: Credential,
    ) -> Result<(), DispatchError> {
        let job_id = envelope.job_id();
        let lock = self.lock_duration(envelope.category());
        let request_id = self.ids.generate_request_id();
        let request = DispatchRequest::new(request_id, envelope, credential);

        enter(ConsumeState::Dispatching);
        debug!(worker = %worker, request_id = %request_id, ?lock, "dispatching job");
        self.events.emit(DomainEvent::JobDispatched {
            job_id: job_id.clone(),
            worker: worker.clone(),
            request_id,
            lock_duration: lock,
        });

        // channel 実装に関係なく lock を超えて待たない
        let sent = match tokio::time::timeout(lock, self.channel.send(worker, request, lock)).await
        {
            Ok(sent) => sent?,
            Err(_elapsed) => SendResult::TimedOut,
        };

        enter(ConsumeState::Classifying);
        classify(job_id, lock, sent)?;
        info!(worker = %worker, "job completed");
        self.events.emit(DomainEvent::JobCompleted {
            job_id: job_id.clone(),
            worker: worker.clone(),
        });
        Ok(())
    }

    fn fail(&self, job_id: &JobId, err: &DispatchError) {
        self.events.emit(DomainEvent::JobFailed {
            job_id: job_id.clone(),
            kind: err.kind(),
            error: err.to_string(),
        });
    }
}

fn enter(state: ConsumeState) {
    Span::current().record("state", state.as_str());
    trace!(state = state.as_str(), "consume state");
}

/// Interpret the result of one request/ack round trip.
pub fn classify(job_id: &JobId, lock: Duration, sent: SendResult) -> Result<(), DispatchError> {
    let responses = match sent {
        SendResult::TimedOut => {
            return Err(DispatchError::DispatchTimeout {
                job_id: job_id.clone(),
                after: lock,
            });
        }
        SendResult::Acknowledged(responses) => responses,
    };

    let response = match responses.as_slice() {
        [] => return Err(DispatchError::Unclassified("empty acknowledgment".to_string())),
        [response] => response,
        [..] => {
            return Err(DispatchError::Unclassified(format!(
                "multiple acknowledgments ({})",
                responses.len()
            )));
        }
    };

    match response.status {
        ResponseStatus::Success => Ok(()),
        ResponseStatus::InternalError => Err(DispatchError::WorkerInternalError {
            message: response
                .error_message
                .clone()
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        }),
    }
}
