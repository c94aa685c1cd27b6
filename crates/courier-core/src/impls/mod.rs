//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryWorkerPool**: プロセス内のワーカープール
//! - **CorrelatedChannel**: request / ack を RequestId で突き合わせるトランスポート
//! - **InMemoryProjectDirectory**: project → platform の対応表
//! - **DevTokenIssuer**: 署名なしの開発用トークン
//! - **RecordingEventSink**: イベントのバッファ
//!
//! # 本番用実装
//! 共有レジストリのプールや WebSocket 上のチャネルは別クレートに配置します。

pub mod correlated_channel;
pub mod dev_token;
pub mod inmem_pool;
pub mod inmem_project;
pub mod recording_sink;

// 主要な型を再エクスポート
pub use self::correlated_channel::{AckHandle, CorrelatedChannel, WorkerSession};
pub use self::dev_token::DevTokenIssuer;
pub use self::inmem_pool::{InMemoryWorkerPool, PoolCounts};
pub use self::inmem_project::InMemoryProjectDirectory;
pub use self::recording_sink::RecordingEventSink;
