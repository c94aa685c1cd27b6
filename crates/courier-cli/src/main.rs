//! courier demo: in-process pool, correlated channel and simulated workers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use courier_core::config::REQUIRED_KEYS;
use courier_core::domain::{
    DispatchResponse, JobCategory, JobData, PlatformId, ProjectId, RunEnvironment,
    UserInteractionJobType, WorkerAddress,
};
use courier_core::impls::{
    CorrelatedChannel, DevTokenIssuer, InMemoryProjectDirectory, InMemoryWorkerPool,
    RecordingEventSink, WorkerSession,
};
use courier_core::observability::{LogFormat, init_logging};
use courier_core::ports::SystemClock;
use courier_core::{ConsumerBuilder, CourierConfig, JobConsumer};
use tracing::{debug, info};

const DEMO_PROJECT: &str = "demo-project";
const DEMO_PLATFORM: &str = "demo-platform";
const FAIL_SUFFIX: &str = "-fail";

#[derive(Debug, Parser)]
#[command(name = "courier", about = "Dispatch a batch of demo jobs to simulated workers")]
struct Args {
    /// Number of simulated workers.
    #[arg(long, default_value_t = 3)]
    workers: usize,

    /// Number of jobs to consume concurrently.
    #[arg(long, default_value_t = 10)]
    jobs: usize,

    /// Every n-th job is answered with INTERNAL_ERROR (0 = never).
    #[arg(long, default_value_t = 4)]
    fail_every: usize,

    /// How long a simulated worker spends on one job.
    #[arg(long, default_value_t = 200)]
    work_ms: u64,

    /// Emit JSON logs.
    #[arg(long)]
    json: bool,
}

/// Fallbacks for required keys so the demo runs without a `.env`.
fn demo_default(key: &str) -> Option<&'static str> {
    REQUIRED_KEYS.iter().any(|k| *k == key).then_some("5")
}

/// 1 ワーカー分のループ：request を受けて少し待ち、ack を返す
async fn simulated_worker(mut session: WorkerSession, work: Duration) {
    // 1 接続で複数ジョブを並行処理する（ack はタスク側から返す）
    let acks = session.ack_handle();
    while let Some(request) = session.next_request().await {
        debug!(worker = %session.worker(), job_id = %request.job_id, "worker received job");
        let acks = acks.clone();
        tokio::spawn(async move {
            tokio::time::sleep(work).await;
            let response = if request.job_id.as_str().ends_with(FAIL_SUFFIX) {
                DispatchResponse::internal_error("simulated failure")
            } else {
                DispatchResponse::success()
            };
            if !acks.acknowledge(request.request_id, vec![response]) {
                debug!(job_id = %request.job_id, "nobody waiting for ack");
            }
        });
    }
}

fn demo_job(category: JobCategory, index: usize) -> JobData {
    let project_id = ProjectId::new(DEMO_PROJECT);
    match category {
        JobCategory::Webhook => JobData::Webhook {
            project_id,
            flow_id: format!("flow-{index}"),
            payload: serde_json::json!({ "index": index }),
        },
        JobCategory::OneTime => JobData::OneTime {
            project_id,
            flow_id: format!("flow-{index}"),
            flow_version_id: format!("flow-{index}-v1"),
            run_id: format!("run-{index}"),
            environment: RunEnvironment::Production,
        },
        JobCategory::Scheduled => JobData::Scheduled {
            project_id,
            flow_id: format!("flow-{index}"),
            flow_version_id: format!("flow-{index}-v1"),
        },
        JobCategory::UserInteraction => JobData::UserInteraction {
            job_type: UserInteractionJobType::ExecuteProperty,
            project_id: Some(project_id),
            platform_id: PlatformId::new(DEMO_PLATFORM),
            details: serde_json::json!({ "property": "auth" }),
        },
        JobCategory::Agent => JobData::Agent {
            project_id,
            agent_id: format!("agent-{index}"),
            prompt: "summarize the inbox".to_string(),
        },
        JobCategory::OutgoingWebhook => JobData::OutgoingWebhook {
            project_id: Some(project_id),
            platform_id: PlatformId::new(DEMO_PLATFORM),
            webhook_id: format!("hook-{index}"),
            url: "https://example.test/hook".to_string(),
            payload: serde_json::json!({ "index": index }),
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(if args.json { LogFormat::Json } else { LogFormat::Pretty });

    // (A) 設定を読む（必須キーが無ければデモ用の値で補う）
    let config = CourierConfig::from_env_with(|key| {
        std::env::var(key)
            .ok()
            .or_else(|| demo_default(key).map(str::to_string))
    })?;

    // (B) ワーカーを接続してプールに登録
    let addresses: Vec<WorkerAddress> = (0..args.workers)
        .map(|i| WorkerAddress::new(format!("worker-{i}")))
        .collect();
    let pool = Arc::new(InMemoryWorkerPool::with_workers(
        addresses.clone(),
        config.acquire_timeout,
    ));
    let channel = Arc::new(CorrelatedChannel::new());
    let work = Duration::from_millis(args.work_ms);
    let workers: Vec<_> = addresses
        .into_iter()
        .map(|address| tokio::spawn(simulated_worker(channel.connect(address), work)))
        .collect();

    // (C) JobConsumer を組み立てる
    let projects = InMemoryProjectDirectory::new();
    projects.insert(ProjectId::new(DEMO_PROJECT), PlatformId::new(DEMO_PLATFORM));
    let events = Arc::new(RecordingEventSink::new());
    let consumer: Arc<JobConsumer> = Arc::new(
        ConsumerBuilder::new()
            .with_config(&config)
            .with_pool(pool.clone())
            .with_channel(channel.clone())
            .with_token_issuer(Arc::new(DevTokenIssuer::new(SystemClock)))
            .with_project_directory(Arc::new(projects))
            .with_event_sink(events.clone())
            .build()?,
    );

    // (D) ジョブを同時に流す
    info!(
        jobs = args.jobs,
        workers = args.workers,
        acquire_timeout = ?pool.acquire_timeout(),
        "consuming demo jobs"
    );
    let handles: Vec<_> = (0..args.jobs)
        .map(|i| {
            let consumer = Arc::clone(&consumer);
            let category = JobCategory::ALL[i % JobCategory::ALL.len()];
            let failing = args.fail_every > 0 && (i + 1) % args.fail_every == 0;
            let job_id = if failing {
                format!("job-{i}{FAIL_SUFFIX}")
            } else {
                format!("job-{i}")
            };
            tokio::spawn(async move {
                let result = consumer
                    .consume(job_id.as_str().into(), category, demo_job(category, i), 0)
                    .await;
                (job_id, category, result)
            })
        })
        .collect();

    for handle in handles {
        let (job_id, category, result) = handle.await?;
        match result {
            Ok(outcome) => println!("{job_id} ({category}): {outcome:?}"),
            Err(err) => println!("{job_id} ({category}): failed [{:?}] {err}", err.kind()),
        }
    }

    // (E) 結果のまとめ
    println!("pool: {:?}", pool.counts().await);
    println!("in flight: {}", channel.in_flight());
    println!("events: {}", events.events().len());

    // サンプルなので worker を止める
    for worker in workers {
        worker.abort();
    }
    Ok(())
}
