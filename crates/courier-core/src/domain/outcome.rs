//! Outcome of a successful consume call.

use super::ids::WorkerAddress;

/// How a consume call succeeded.
///
/// A skip is a legitimate no-op, not a failure; the caller acks the job
/// either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The worker acknowledged with `SUCCESS`.
    Completed { worker: WorkerAddress },
    /// The pre-dispatch filter vetoed the attempt. No worker was leased.
    Skipped { reason: Option<String> },
}

impl ConsumeOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ConsumeOutcome::Skipped { .. })
    }
}
