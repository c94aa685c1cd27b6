//! ProjectDirectory port - project → platform の解決（外部コンポーネント）

use async_trait::async_trait;

use crate::domain::errors::DispatchError;
use crate::domain::ids::{PlatformId, ProjectId};

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Platform that owns `project_id`, or [`DispatchError::ProjectNotFound`].
    async fn platform_id(&self, project_id: &ProjectId) -> Result<PlatformId, DispatchError>;
}
