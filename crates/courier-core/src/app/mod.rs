//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **ConsumerBuilder**: JobConsumer の構築とワイヤリング
//! - **JobConsumer**: 1 件のジョブの filter → lease → dispatch → classify → release
//! - **LeaseGuard**: ワーカー lease の RAII ガード

pub mod builder;
pub mod consumer;
pub mod lease;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, ConsumerBuilder};
pub use self::consumer::{JobConsumer, JobOwner, classify};
pub use self::lease::LeaseGuard;
