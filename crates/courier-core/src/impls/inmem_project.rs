//! InMemoryProjectDirectory - project → platform の対応表（開発用・テスト用）

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::errors::DispatchError;
use crate::domain::ids::{PlatformId, ProjectId};
use crate::ports::ProjectDirectory;

#[derive(Default)]
pub struct InMemoryProjectDirectory {
    owners: RwLock<HashMap<ProjectId, PlatformId>>,
}

impl InMemoryProjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects<I>(projects: I) -> Self
    where
        I: IntoIterator<Item = (ProjectId, PlatformId)>,
    {
        Self {
            owners: RwLock::new(projects.into_iter().collect()),
        }
    }

    /// Returns the previous owner, if any.
    pub fn insert(&self, project_id: ProjectId, platform_id: PlatformId) -> Option<PlatformId> {
        self.owners.write().insert(project_id, platform_id)
    }

    pub fn remove(&self, project_id: &ProjectId) -> Option<PlatformId> {
        self.owners.write().remove(project_id)
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryProjectDirectory {
    async fn platform_id(&self, project_id: &ProjectId) -> Result<PlatformId, DispatchError> {
        self.owners
            .read()
            .get(project_id)
            .cloned()
            .ok_or_else(|| DispatchError::ProjectNotFound(project_id.clone()))
    }
}
