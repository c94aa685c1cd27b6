//! State - 1 回の consume の状態
//!
//! # 状態遷移
//! - Filtering → Done（skip）
//! - Filtering → Leasing → Dispatching → Classifying → Released → Done
//! - Leasing 成功後はどの経路でも Released を通る（エラー・panic・drop を含む）

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumeState {
    /// Pre-dispatch filter is running.
    Filtering,
    /// Owner ids, credential and worker lease are being obtained.
    Leasing,
    /// Request sent, waiting for the acknowledgment.
    Dispatching,
    /// Interpreting the acknowledgment (or its absence).
    Classifying,
    /// Lease returned to the pool.
    Released,
    /// Terminal classification handed back to the caller.
    Done,
}

impl ConsumeState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsumeState::Filtering => "filtering",
            ConsumeState::Leasing => "leasing",
            ConsumeState::Dispatching => "dispatching",
            ConsumeState::Classifying => "classifying",
            ConsumeState::Released => "released",
            ConsumeState::Done => "done",
        }
    }
}
