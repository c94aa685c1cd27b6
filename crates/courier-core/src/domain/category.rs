//! Job categories (the closed set of job kinds).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a dequeued job.
///
/// Every category carries its own payload shape, timeout family and skip
/// filter. The set is closed: adding a category means touching every `match`
/// on it, which is the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCategory {
    /// Incoming webhook that fires a flow trigger.
    Webhook,
    /// A single flow run (manual, resumed or test).
    OneTime,
    /// Polling trigger on a schedule.
    Scheduled,
    /// Interactive request from a user in the builder.
    UserInteraction,
    /// Agent execution.
    Agent,
    /// Outbound webhook delivery.
    OutgoingWebhook,
}

impl JobCategory {
    pub const ALL: [JobCategory; 6] = [
        JobCategory::Webhook,
        JobCategory::OneTime,
        JobCategory::Scheduled,
        JobCategory::UserInteraction,
        JobCategory::Agent,
        JobCategory::OutgoingWebhook,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobCategory::Webhook => "webhook",
            JobCategory::OneTime => "one_time",
            JobCategory::Scheduled => "scheduled",
            JobCategory::UserInteraction => "user_interaction",
            JobCategory::Agent => "agent",
            JobCategory::OutgoingWebhook => "outgoing_webhook",
        }
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
