//! Pre-dispatch filters: decide whether a job attempt should run at all.
//!
//! Filters run before any resource is committed, so they are pure functions
//! of the payload and the attempt count. No I/O, no leases.

use super::category::JobCategory;
use super::job::JobData;

/// Verdict of a pre-dispatch filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipDecision {
    pub should_skip: bool,
    pub reason: Option<String>,
}

impl SkipDecision {
    pub fn proceed() -> Self {
        Self {
            should_skip: false,
            reason: None,
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            should_skip: true,
            reason: Some(reason.into()),
        }
    }
}

/// Per-category skip policy.
///
/// Implementations must be side-effect free: given the same payload and
/// attempt count they return the same decision.
pub trait PreDispatchFilter: Send + Sync {
    fn evaluate(&self, data: &JobData, attempts_started: u32) -> SkipDecision;
}

/// Attempt ceilings used to build a [`FilterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// Ceiling for every category without a dedicated one.
    pub max_attempts: u32,
    /// Scheduled polls are not replayed: the next tick covers a missed one.
    pub scheduled_max_attempts: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            scheduled_max_attempts: 1,
        }
    }
}

/// Skips an attempt once `attempts_started` reaches the ceiling.
#[derive(Debug, Clone, Copy)]
pub struct AttemptCeiling {
    max_attempts: u32,
}

impl AttemptCeiling {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl PreDispatchFilter for AttemptCeiling {
    fn evaluate(&self, _data: &JobData, attempts_started: u32) -> SkipDecision {
        if attempts_started >= self.max_attempts {
            SkipDecision::skip(format!(
                "attempt budget exhausted ({attempts_started}/{})",
                self.max_attempts
            ))
        } else {
            SkipDecision::proceed()
        }
    }
}

/// A user is waiting on interactive jobs; they always run.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractiveFilter;

impl PreDispatchFilter for InteractiveFilter {
    fn evaluate(&self, _data: &JobData, _attempts_started: u32) -> SkipDecision {
        SkipDecision::proceed()
    }
}

/// Attempt ceiling plus a guard against deliveries with nowhere to go.
#[derive(Debug, Clone, Copy)]
pub struct OutgoingWebhookFilter {
    ceiling: AttemptCeiling,
}

impl PreDispatchFilter for OutgoingWebhookFilter {
    fn evaluate(&self, data: &JobData, attempts_started: u32) -> SkipDecision {
        if let JobData::OutgoingWebhook { url, .. } = data
            && url.trim().is_empty()
        {
            return SkipDecision::skip("webhook target url is empty");
        }
        self.ceiling.evaluate(data, attempts_started)
    }
}

/// One filter per category, selected by a closed `match`.
#[derive(Debug, Clone, Copy)]
pub struct FilterSet {
    webhook: AttemptCeiling,
    one_time: AttemptCeiling,
    scheduled: AttemptCeiling,
    agent: AttemptCeiling,
    user_interaction: InteractiveFilter,
    outgoing_webhook: OutgoingWebhookFilter,
}

impl FilterSet {
    pub fn new(config: FilterConfig) -> Self {
        let ceiling = AttemptCeiling::new(config.max_attempts);
        Self {
            webhook: ceiling,
            one_time: ceiling,
            scheduled: AttemptCeiling::new(config.scheduled_max_attempts),
            agent: ceiling,
            user_interaction: InteractiveFilter,
            outgoing_webhook: OutgoingWebhookFilter { ceiling },
        }
    }

    pub fn filter_for(&self, category: JobCategory) -> &dyn PreDispatchFilter {
        match category {
            JobCategory::Webhook => &self.webhook,
            JobCategory::OneTime => &self.one_time,
            JobCategory::Scheduled => &self.scheduled,
            JobCategory::UserInteraction => &self.user_interaction,
            JobCategory::Agent => &self.agent,
            JobCategory::OutgoingWebhook => &self.outgoing_webhook,
        }
    }

    pub fn evaluate(&self, data: &JobData, attempts_started: u32) -> SkipDecision {
        self.filter_for(data.category())
            .evaluate(data, attempts_started)
    }
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
