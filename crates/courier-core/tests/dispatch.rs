//! End-to-end dispatch properties: lease balance, skips, deadlines, routing
//! and concurrency, driven through `JobConsumer` with a paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::domain::{
    DispatchRequest, DispatchResponse, JobCategory, JobData, JobId, PlatformId, ProjectId,
    RunEnvironment, TimeoutPolicy, UserInteractionJobType, WorkerAddress,
};
use courier_core::impls::{
    CorrelatedChannel, DevTokenIssuer, InMemoryProjectDirectory, InMemoryWorkerPool,
    RecordingEventSink,
};
use courier_core::ports::{DispatchChannel, SendResult, SystemClock, WorkerPool};
use courier_core::{ConsumeOutcome, ConsumerBuilder, DispatchError, JobConsumer};
use parking_lot::Mutex;
use rstest::rstest;
use tokio::time::Instant;

// ========================================
// テスト用のスタブ
// ========================================

/// Wraps the in-memory pool and counts every acquire and release.
struct CountingPool {
    inner: InMemoryWorkerPool,
    acquires: AtomicUsize,
    releases: AtomicUsize,
    leased_now: AtomicUsize,
    max_leased: AtomicUsize,
}

impl CountingPool {
    fn new(workers: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryWorkerPool::with_workers(
                (0..workers).map(|i| WorkerAddress::new(format!("w{i}"))),
                None,
            ),
            acquires: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            leased_now: AtomicUsize::new(0),
            max_leased: AtomicUsize::new(0),
        })
    }

    fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn max_leased(&self) -> usize {
        self.max_leased.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerPool for CountingPool {
    async fn acquire(&self) -> Result<WorkerAddress, DispatchError> {
        let worker = self.inner.acquire().await?;
        self.acquires.fetch_add(1, Ordering::SeqCst);
        let now = self.leased_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_leased.fetch_max(now, Ordering::SeqCst);
        Ok(worker)
    }

    async fn release(&self, worker: &WorkerAddress) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.leased_now.fetch_sub(1, Ordering::SeqCst);
        self.inner.release(worker).await;
    }
}

#[derive(Clone)]
enum Reply {
    Ack(Vec<DispatchResponse>),
    AckAfter(Duration, Vec<DispatchResponse>),
    Never,
    Disconnect,
    Panic,
}

/// Channel stub that answers every request the same way and records what it saw.
struct StubChannel {
    reply: Reply,
    seen: Mutex<Vec<(DispatchRequest, Duration)>>,
}

impl StubChannel {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<(DispatchRequest, Duration)> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl DispatchChannel for StubChannel {
    async fn send(
        &self,
        worker: &WorkerAddress,
        request: DispatchRequest,
        timeout: Duration,
    ) -> Result<SendResult, DispatchError> {
        self.seen.lock().push((request, timeout));
        match self.reply.clone() {
            Reply::Ack(responses) => Ok(SendResult::Acknowledged(responses)),
            Reply::AckAfter(delay, responses) => {
                tokio::time::sleep(delay).await;
                Ok(SendResult::Acknowledged(responses))
            }
            // タイムアウトは consumer 側の期限に任せる
            Reply::Never => std::future::pending().await,
            Reply::Disconnect => Err(DispatchError::WorkerDisconnected(worker.clone())),
            Reply::Panic => panic!("transport exploded"),
        }
    }
}

// ========================================
// ヘルパー
// ========================================

fn timeouts() -> TimeoutPolicy {
    // trigger, flow, agent, outgoing webhook
    TimeoutPolicy::from_secs(10, 30, 45, 20)
}

fn consumer(
    pool: Arc<dyn WorkerPool>,
    channel: Arc<dyn DispatchChannel>,
    events: Arc<RecordingEventSink>,
) -> Arc<JobConsumer> {
    let projects = InMemoryProjectDirectory::new();
    projects.insert(ProjectId::new("proj"), PlatformId::new("plat"));
    Arc::new(
        ConsumerBuilder::new()
            .with_pool(pool)
            .with_channel(channel)
            .with_token_issuer(Arc::new(DevTokenIssuer::new(SystemClock)))
            .with_project_directory(Arc::new(projects))
            .with_event_sink(events)
            .with_timeouts(timeouts())
            .build()
            .unwrap(),
    )
}

fn job(category: JobCategory) -> JobData {
    let project_id = ProjectId::new("proj");
    match category {
        JobCategory::Webhook => JobData::Webhook {
            project_id,
            flow_id: "flow".to_string(),
            payload: serde_json::json!({ "body": "x" }),
        },
        JobCategory::OneTime => JobData::OneTime {
            project_id,
            flow_id: "flow".to_string(),
            flow_version_id: "flow-v1".to_string(),
            run_id: "run".to_string(),
            environment: RunEnvironment::Testing,
        },
        JobCategory::Scheduled => JobData::Scheduled {
            project_id,
            flow_id: "flow".to_string(),
            flow_version_id: "flow-v1".to_string(),
        },
        JobCategory::UserInteraction => JobData::UserInteraction {
            job_type: UserInteractionJobType::ExecuteTrigger,
            project_id: Some(project_id),
            platform_id: PlatformId::new("plat"),
            details: serde_json::Value::Null,
        },
        JobCategory::Agent => JobData::Agent {
            project_id,
            agent_id: "agent".to_string(),
            prompt: "hello".to_string(),
        },
        JobCategory::OutgoingWebhook => JobData::OutgoingWebhook {
            project_id: None,
            platform_id: PlatformId::new("plat"),
            webhook_id: "hook".to_string(),
            url: "https://example.test/hook".to_string(),
            payload: serde_json::Value::Null,
        },
    }
}

// ========================================
// lease の収支
// ========================================

#[rstest]
#[case::success(Reply::Ack(vec![DispatchResponse::success()]), true)]
#[case::internal_error(Reply::Ack(vec![DispatchResponse::internal_error("boom")]), false)]
#[case::empty_ack(Reply::Ack(vec![]), false)]
#[case::timeout(Reply::Never, false)]
#[case::disconnected(Reply::Disconnect, false)]
#[case::panic(Reply::Panic, false)]
#[tokio::test(start_paused = true)]
async fn every_lease_is_released(#[case] reply: Reply, #[case] succeeds: bool) {
    let pool = CountingPool::new(1);
    let consumer = consumer(pool.clone(), StubChannel::new(reply), Arc::new(RecordingEventSink::new()));

    let task = tokio::spawn({
        let consumer = Arc::clone(&consumer);
        async move {
            consumer
                .consume(JobId::new("job"), JobCategory::OneTime, job(JobCategory::OneTime), 0)
                .await
        }
    });
    let outcome = task.await;

    match outcome {
        Ok(result) => assert_eq!(result.is_ok(), succeeds),
        Err(join) => assert!(join.is_panic()),
    }

    // panic 経路の background release を待つ
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(pool.acquires(), 1);
    assert_eq!(pool.releases(), 1);
}

#[tokio::test]
async fn failed_acquire_releases_nothing() {
    let pool = Arc::new(InMemoryWorkerPool::new(Some(Duration::from_millis(20))));
    let consumer = consumer(
        pool.clone(),
        StubChannel::new(Reply::Ack(vec![DispatchResponse::success()])),
        Arc::new(RecordingEventSink::new()),
    );

    let err = consumer
        .consume(JobId::new("job"), JobCategory::Agent, job(JobCategory::Agent), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::NoWorkerAvailable { .. }));
    assert!(err.is_retryable());
    assert_eq!(pool.counts().await.leased, 0);
}

// ========================================
// skip
// ========================================

#[tokio::test]
async fn skipped_job_never_touches_pool_or_channel() {
    let pool = CountingPool::new(1);
    let channel = StubChannel::new(Reply::Ack(vec![DispatchResponse::success()]));
    let events = Arc::new(RecordingEventSink::new());
    let consumer = consumer(pool.clone(), channel.clone(), events.clone());

    let outcome = consumer
        .consume(JobId::new("tick"), JobCategory::Scheduled, job(JobCategory::Scheduled), 1)
        .await
        .unwrap();

    assert!(outcome.is_skipped());
    assert_eq!(pool.acquires(), 0);
    assert!(channel.seen().is_empty());
    assert_eq!(events.names(), vec!["job_skipped"]);
}

// ========================================
// タイムアウトとエラー
// ========================================

#[tokio::test(start_paused = true)]
async fn silent_worker_times_out_at_lock_duration() {
    let pool = CountingPool::new(1);
    let consumer = consumer(pool.clone(), StubChannel::new(Reply::Never), Arc::new(RecordingEventSink::new()));

    let start = Instant::now();
    let err = consumer
        .consume(JobId::new("slow"), JobCategory::OneTime, job(JobCategory::OneTime), 0)
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(
        err,
        DispatchError::DispatchTimeout { ref job_id, after }
            if job_id.as_str() == "slow" && after == Duration::from_secs(90)
    ));
    assert!(elapsed >= Duration::from_secs(90));
    assert!(elapsed < Duration::from_secs(91));
    assert_eq!(pool.releases(), 1);
}

#[tokio::test]
async fn worker_error_message_surfaces_verbatim() {
    let pool = CountingPool::new(1);
    let events = Arc::new(RecordingEventSink::new());
    let consumer = consumer(
        pool.clone(),
        StubChannel::new(Reply::Ack(vec![DispatchResponse::internal_error("boom")])),
        events.clone(),
    );

    let err = consumer
        .consume(JobId::new("job"), JobCategory::Webhook, job(JobCategory::Webhook), 0)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "boom");
    assert_eq!(pool.releases(), 1);
    assert_eq!(
        events.names(),
        vec!["worker_leased", "job_dispatched", "worker_released", "job_failed"]
    );
}

#[tokio::test]
async fn successful_dispatch_emits_full_lifecycle() {
    let pool = CountingPool::new(1);
    let channel = StubChannel::new(Reply::Ack(vec![DispatchResponse::success()]));
    let events = Arc::new(RecordingEventSink::new());
    let consumer = consumer(pool.clone(), channel.clone(), events.clone());

    let outcome = consumer
        .consume(JobId::new("job"), JobCategory::Agent, job(JobCategory::Agent), 2)
        .await
        .unwrap();

    assert_eq!(outcome, ConsumeOutcome::Completed { worker: WorkerAddress::new("w0") });
    assert_eq!(
        events.names(),
        vec!["worker_leased", "job_dispatched", "job_completed", "worker_released"]
    );

    let seen = channel.seen();
    assert_eq!(seen.len(), 1);
    let (request, _) = &seen[0];
    assert_eq!(request.job_id, JobId::new("job"));
    assert_eq!(request.attempts_started, 2);
    assert_eq!(request.job_data, job(JobCategory::Agent));
    assert!(request.credential.expose().contains("\"platform_id\":\"plat\""));
}

// ========================================
// カテゴリごとの timeout
// ========================================

#[rstest]
#[case::webhook(JobCategory::Webhook, 70)]
#[case::scheduled(JobCategory::Scheduled, 70)]
#[case::one_time(JobCategory::OneTime, 90)]
#[case::user_interaction(JobCategory::UserInteraction, 90)]
#[case::agent(JobCategory::Agent, 105)]
#[case::outgoing_webhook(JobCategory::OutgoingWebhook, 80)]
#[tokio::test]
async fn lock_duration_follows_category(#[case] category: JobCategory, #[case] expected_secs: u64) {
    let channel = StubChannel::new(Reply::Ack(vec![DispatchResponse::success()]));
    let consumer = consumer(CountingPool::new(1), channel.clone(), Arc::new(RecordingEventSink::new()));

    consumer
        .consume(JobId::new("job"), category, job(category), 0)
        .await
        .unwrap();

    let seen = channel.seen();
    assert_eq!(seen[0].1, Duration::from_secs(expected_secs));
    assert_eq!(seen[0].0.category, category);
}

// ========================================
// 並行性
// ========================================

#[tokio::test(start_paused = true)]
async fn concurrent_consumers_never_exceed_pool_size() {
    let pool = CountingPool::new(2);
    let channel = StubChannel::new(Reply::AckAfter(
        Duration::from_secs(5),
        vec![DispatchResponse::success()],
    ));
    let consumer = consumer(pool.clone(), channel, Arc::new(RecordingEventSink::new()));

    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move {
                consumer
                    .consume(
                        JobId::new(format!("job-{i}")),
                        JobCategory::Agent,
                        job(JobCategory::Agent),
                        0,
                    )
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
    assert_eq!(pool.max_leased(), 2);
    assert_eq!(pool.acquires(), 5);
    assert_eq!(pool.releases(), 5);
}

/// Pool of one, flow timeout 30s: job A's worker never answers, so A fails
/// at about 90s and B, queued behind it, gets the worker right after.
#[tokio::test(start_paused = true)]
async fn timed_out_job_frees_worker_for_the_next_one() {
    let pool = Arc::new(InMemoryWorkerPool::with_workers([WorkerAddress::new("solo")], None));
    let channel = Arc::new(CorrelatedChannel::new());
    let mut session = channel.connect(WorkerAddress::new("solo"));
    let worker = tokio::spawn(async move {
        while let Some(request) = session.next_request().await {
            if request.job_id.as_str() != "a" {
                session.acknowledge(request.request_id, vec![DispatchResponse::success()]);
            }
        }
    });
    let consumer = consumer(pool.clone(), channel.clone(), Arc::new(RecordingEventSink::new()));
    let start = Instant::now();

    let a = tokio::spawn({
        let consumer = Arc::clone(&consumer);
        async move {
            let result = consumer
                .consume(JobId::new("a"), JobCategory::OneTime, job(JobCategory::OneTime), 0)
                .await;
            (result, start.elapsed())
        }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    let b = tokio::spawn({
        let consumer = Arc::clone(&consumer);
        async move {
            let result = consumer
                .consume(JobId::new("b"), JobCategory::OneTime, job(JobCategory::OneTime), 0)
                .await;
            (result, start.elapsed())
        }
    });

    let (a_result, a_done) = a.await.unwrap();
    let (b_result, b_done) = b.await.unwrap();

    assert!(matches!(a_result, Err(DispatchError::DispatchTimeout { .. })));
    assert!(a_done >= Duration::from_secs(90) && a_done < Duration::from_secs(91));
    assert_eq!(
        b_result.unwrap(),
        ConsumeOutcome::Completed { worker: WorkerAddress::new("solo") }
    );
    assert!(b_done >= Duration::from_secs(90));
    assert!(b_done.saturating_sub(a_done) < Duration::from_secs(1));
    assert_eq!(channel.in_flight(), 0);
    assert_eq!(pool.counts().await.leased, 0);

    worker.abort();
}
