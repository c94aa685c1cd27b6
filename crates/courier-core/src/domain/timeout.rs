//! Timeout policy: category → allowed execution window.

use std::time::Duration;

use super::category::JobCategory;

/// Extra time on top of the worker's own budget before the control plane
/// gives up on an acknowledgment. Covers transport and scheduling latency.
pub const LOCK_PADDING: Duration = Duration::from_secs(60);

/// Per-family execution limits, read once from configuration.
///
/// Four families cover the six categories:
/// - trigger: webhook, scheduled
/// - flow: one-time, user interaction
/// - agent: agent
/// - outgoing webhook: outgoing webhook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    trigger: Duration,
    flow: Duration,
    agent: Duration,
    outgoing_webhook: Duration,
}

impl TimeoutPolicy {
    pub fn new(
        trigger: Duration,
        flow: Duration,
        agent: Duration,
        outgoing_webhook: Duration,
    ) -> Self {
        Self {
            trigger,
            flow,
            agent,
            outgoing_webhook,
        }
    }

    pub fn from_secs(trigger: u64, flow: u64, agent: u64, outgoing_webhook: u64) -> Self {
        Self::new(
            Duration::from_secs(trigger),
            Duration::from_secs(flow),
            Duration::from_secs(agent),
            Duration::from_secs(outgoing_webhook),
        )
    }

    /// The worker's execution budget for this category.
    pub fn raw_duration(&self, category: JobCategory) -> Duration {
        match category {
            JobCategory::Webhook | JobCategory::Scheduled => self.trigger,
            JobCategory::OneTime | JobCategory::UserInteraction => self.flow,
            JobCategory::Agent => self.agent,
            JobCategory::OutgoingWebhook => self.outgoing_webhook,
        }
    }

    /// How long a dispatch may hold its lease: raw budget plus [`LOCK_PADDING`].
    pub fn lock_duration(&self, category: JobCategory) -> Duration {
        self.raw_duration(category).saturating_add(LOCK_PADDING)
    }
}
