//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! ワーカープール、dispatch 用トランスポート、トークン発行、project 解決など
//! courier の外側にあるものはすべてここの trait 越しに使います。

pub mod clock;
pub mod dispatch_channel;
pub mod event_sink;
pub mod id_generator;
pub mod project_directory;
pub mod token_issuer;
pub mod worker_pool;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::dispatch_channel::{DispatchChannel, SendResult};
pub use self::event_sink::{EventSink, NoopEventSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::project_directory::ProjectDirectory;
pub use self::token_issuer::TokenIssuer;
pub use self::worker_pool::WorkerPool;
