//! EventSink port - ドメインイベントの記録
//!
//! - NoopEventSink: 何もしない（デフォルト）
//! - RecordingEventSink（impls）: テスト・デモ用のバッファ

use crate::domain::events::DomainEvent;

/// Records domain events. Must not block: it is called on the dispatch path.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: DomainEvent) {}
}
