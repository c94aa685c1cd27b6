//! RecordingEventSink - 発行されたイベントを溜めるだけの EventSink（テスト・デモ用）

use parking_lot::Mutex;

use crate::domain::events::DomainEvent;
use crate::ports::EventSink;

#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    /// Event names in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(DomainEvent::name).collect()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: DomainEvent) {
        self.events.lock().push(event);
    }
}
