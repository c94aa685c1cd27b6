//! ConsumerBuilder - JobConsumer の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use crate::app::consumer::JobConsumer;
use crate::config::CourierConfig;
use crate::domain::filter::{FilterConfig, FilterSet};
use crate::domain::timeout::TimeoutPolicy;
use crate::ports::{
    DispatchChannel, EventSink, IdGenerator, NoopEventSink, ProjectDirectory, SystemClock,
    TokenIssuer, UlidGenerator, WorkerPool,
};

/// ConsumerBuilder は JobConsumer を構築
///
/// # 使用例
/// ```ignore
/// let consumer = ConsumerBuilder::new()
///     .with_config(&config)
///     .with_pool(pool)
///     .with_channel(channel)
///     .with_token_issuer(tokens)
///     .with_project_directory(projects)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - pool, channel, token issuer, project directory, timeouts は必須
/// - build() 時に不足しているものをまとめて BuildError で返す
/// - event sink, id generator, filters は省略可能（デフォルトあり）
#[derive(Default)]
pub struct ConsumerBuilder {
    pool: Option<Arc<dyn WorkerPool>>,
    channel: Option<Arc<dyn DispatchChannel>>,
    tokens: Option<Arc<dyn TokenIssuer>>,
    projects: Option<Arc<dyn ProjectDirectory>>,
    events: Option<Arc<dyn EventSink>>,
    ids: Option<Arc<dyn IdGenerator>>,
    timeouts: Option<TimeoutPolicy>,
    filters: FilterConfig,
}

/// BuildError は JobConsumer 構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These must be provided before build().")]
    MissingComponents(Vec<&'static str>),
}

impl ConsumerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// タイムアウトと filter の設定をまとめて適用
    pub fn with_config(self, config: &CourierConfig) -> Self {
        self.with_timeouts(config.timeouts)
            .with_filters(config.filters)
    }

    pub fn with_pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_channel(mut self, channel: Arc<dyn DispatchChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_token_issuer(mut self, tokens: Arc<dyn TokenIssuer>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_project_directory(mut self, projects: Arc<dyn ProjectDirectory>) -> Self {
        self.projects = Some(projects);
        self
    }

    /// 省略時は NoopEventSink
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// 省略時は SystemClock ベースの UlidGenerator
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    pub fn with_filters(mut self, filters: FilterConfig) -> Self {
        self.filters = filters;
        self
    }

    /// JobConsumer を構築
    ///
    /// # 検証
    /// - 必須コンポーネントが全て設定されているかチェック
    /// - 不足があれば BuildError::MissingComponents を返す
    pub fn build(self) -> Result<JobConsumer, BuildError> {
        let mut missing = Vec::new();
        if self.pool.is_none() {
            missing.push("worker pool");
        }
        if self.channel.is_none() {
            missing.push("dispatch channel");
        }
        if self.tokens.is_none() {
            missing.push("token issuer");
        }
        if self.projects.is_none() {
            missing.push("project directory");
        }
        if self.timeouts.is_none() {
            missing.push("timeouts");
        }

        match (self.pool, self.channel, self.tokens, self.projects, self.timeouts) {
            (Some(pool), Some(channel), Some(tokens), Some(projects), Some(timeouts)) => {
                Ok(JobConsumer {
                    filters: FilterSet::new(self.filters),
                    timeouts,
                    pool,
                    channel,
                    tokens,
                    projects,
                    ids: self
                        .ids
                        .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock))),
                    events: self.events.unwrap_or_else(|| Arc::new(NoopEventSink)),
                })
            }
            _ => Err(BuildError::MissingComponents(missing)),
        }
    }
}
