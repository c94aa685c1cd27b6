//! TokenIssuer port - ジョブ単位の認証情報の発行（外部コンポーネント）

use async_trait::async_trait;

use crate::domain::errors::DispatchError;
use crate::domain::ids::{JobId, PlatformId, ProjectId};
use crate::domain::wire::Credential;

/// Mints the credential a worker uses to call back into the control plane.
///
/// courier treats the result as an opaque string. Platform-scoped jobs may
/// have no project, in which case `project_id` is `None`.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(
        &self,
        job_id: &JobId,
        project_id: Option<&ProjectId>,
        platform_id: &PlatformId,
    ) -> Result<Credential, DispatchError>;
}
