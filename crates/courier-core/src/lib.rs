//! courier-core
//!
//! Job dispatch and worker-lease core. One dequeued job is sent to a leased
//! remote worker over a request/ack channel with a category-specific deadline.
//! The worker goes back to the pool on every exit path.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, category, job, wire, filter, timeout, state, events, errors）
//! - **ports**: 抽象化レイヤー（WorkerPool, DispatchChannel, TokenIssuer, ProjectDirectory, EventSink, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（ConsumerBuilder, JobConsumer, LeaseGuard）
//! - **impls**: 実装（InMemoryWorkerPool, CorrelatedChannel など開発用）
//! - **config**: 環境変数からの設定
//! - **observability**: ログ初期化と span

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use self::app::{BuildError, ConsumerBuilder, JobConsumer};
pub use self::config::{ConfigError, CourierConfig};
pub use self::domain::{ConsumeOutcome, DispatchError, ErrorKind};
