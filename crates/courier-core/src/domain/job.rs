//! Job payloads and the immutable envelope handed to the consumer.

use serde::{Deserialize, Serialize};

use super::category::JobCategory;
use super::errors::DispatchError;
use super::ids::{JobId, PlatformId, ProjectId};

/// Sub-kind of an interactive job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserInteractionJobType {
    ExecuteValidation,
    ExecuteExtractPieceInformation,
    ExecuteTool,
    ExecuteProperty,
    ExecuteTrigger,
    ExecuteFlow,
}

impl UserInteractionJobType {
    /// Platform-scoped jobs carry both owner ids in the payload.
    /// The rest are project-scoped and need a platform lookup.
    pub fn carries_platform(self) -> bool {
        matches!(
            self,
            UserInteractionJobType::ExecuteValidation
                | UserInteractionJobType::ExecuteExtractPieceInformation
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEnvironment {
    #[default]
    Production,
    Testing,
}

/// Category-specific payload.
///
/// `category` タグでシリアライズされます。variant と `JobCategory` は 1:1 です。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum JobData {
    Webhook {
        project_id: ProjectId,
        flow_id: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    OneTime {
        project_id: ProjectId,
        flow_id: String,
        flow_version_id: String,
        run_id: String,
        #[serde(default)]
        environment: RunEnvironment,
    },
    Scheduled {
        project_id: ProjectId,
        flow_id: String,
        flow_version_id: String,
    },
    UserInteraction {
        job_type: UserInteractionJobType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_id: Option<ProjectId>,
        platform_id: PlatformId,
        #[serde(default)]
        details: serde_json::Value,
    },
    Agent {
        project_id: ProjectId,
        agent_id: String,
        prompt: String,
    },
    OutgoingWebhook {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_id: Option<ProjectId>,
        platform_id: PlatformId,
        webhook_id: String,
        url: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl JobData {
    pub fn category(&self) -> JobCategory {
        match self {
            JobData::Webhook { .. } => JobCategory::Webhook,
            JobData::OneTime { .. } => JobCategory::OneTime,
            JobData::Scheduled { .. } => JobCategory::Scheduled,
            JobData::UserInteraction { .. } => JobCategory::UserInteraction,
            JobData::Agent { .. } => JobCategory::Agent,
            JobData::OutgoingWebhook { .. } => JobCategory::OutgoingWebhook,
        }
    }

    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            JobData::Webhook { project_id, .. }
            | JobData::OneTime { project_id, .. }
            | JobData::Scheduled { project_id, .. }
            | JobData::Agent { project_id, .. } => Some(project_id),
            JobData::UserInteraction { project_id, .. }
            | JobData::OutgoingWebhook { project_id, .. } => project_id.as_ref(),
        }
    }
}

/// One dequeued job attempt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    job_id: JobId,
    category: JobCategory,
    data: JobData,
    attempts_started: u32,
}

impl JobEnvelope {
    /// Build an envelope, rejecting a payload that belongs to another category.
    pub fn new(
        job_id: JobId,
        category: JobCategory,
        data: JobData,
        attempts_started: u32,
    ) -> Result<Self, DispatchError> {
        let actual = data.category();
        if actual != category {
            return Err(DispatchError::CategoryMismatch {
                declared: category,
                actual,
            });
        }
        Ok(Self {
            job_id,
            category,
            data,
            attempts_started,
        })
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn category(&self) -> JobCategory {
        self.category
    }

    pub fn data(&self) -> &JobData {
        &self.data
    }

    pub fn attempts_started(&self) -> u32 {
        self.attempts_started
    }
}
