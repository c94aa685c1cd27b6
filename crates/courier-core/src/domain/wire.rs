//! Wire envelopes exchanged with a worker over the dispatch channel.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::category::JobCategory;
use super::ids::{JobId, RequestId};
use super::job::{JobData, JobEnvelope};

/// Job-scoped credential the worker uses to call back into the control plane.
///
/// Opaque to courier. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Request sent to exactly one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub request_id: RequestId,
    pub job_id: JobId,
    pub category: JobCategory,
    pub job_data: JobData,
    pub attempts_started: u32,
    pub credential: Credential,
}

impl DispatchRequest {
    pub fn new(request_id: RequestId, envelope: &JobEnvelope, credential: Credential) -> Self {
        Self {
            request_id,
            job_id: envelope.job_id().clone(),
            category: envelope.category(),
            job_data: envelope.data().clone(),
            attempts_started: envelope.attempts_started(),
            credential,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    InternalError,
}

/// Terminal response of a worker. An acknowledgment carries a collection of
/// these; exactly one is expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DispatchResponse {
    pub fn success() -> Self {
        Self {
            status: ResponseStatus::Success,
            error_message: None,
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::InternalError,
            error_message: Some(message.into()),
        }
    }
}
