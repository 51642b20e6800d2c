//! Project registry
//!
//! Projects live in the `_projects` index document. Every child-document
//! write touches the owning project's `updated_at`. Projects are never
//! deleted.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::error::{Error, Result};
use crate::store::{self, DocumentStore, ProjectLocks, PROJECT_INDEX};
use crate::types::Project;

pub struct ProjectRegistry {
    store: Arc<dyn DocumentStore>,
    locks: Arc<ProjectLocks>,
}

impl ProjectRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<ProjectLocks>) -> Self {
        Self { store, locks }
    }

    /// Create a project and register it in the index
    pub async fn create(&self, name: &str, brand_context: &str) -> Result<Project> {
        if name.trim().is_empty() {
            return Err(Error::validation("project name must not be empty"));
        }

        let now = Utc::now();
        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            brand_context: brand_context.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        let lock = self.locks.for_project(PROJECT_INDEX).await;
        let _guard = lock.lock().await;

        let mut projects: Vec<Project> = store::load_list(&*self.store, PROJECT_INDEX).await?;
        projects.push(project.clone());
        store::save_list(&*self.store, PROJECT_INDEX, &projects).await?;

        info!("Created project {} ({})", project.name, project.id);
        Ok(project)
    }

    /// All projects, oldest first
    pub async fn list(&self) -> Result<Vec<Project>> {
        store::load_list(&*self.store, PROJECT_INDEX).await
    }

    /// Look up a project by id
    pub async fn get(&self, project_id: &str) -> Result<Project> {
        let projects: Vec<Project> = store::load_list(&*self.store, PROJECT_INDEX).await?;
        projects
            .into_iter()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Error::not_found("project", project_id))
    }

    /// Update `updated_at` after a child-document write.
    ///
    /// Caller must already hold the project lock; this only touches the
    /// global index, which has its own short critical section.
    pub async fn touch(&self, project_id: &str) -> Result<()> {
        let lock = self.locks.for_project(PROJECT_INDEX).await;
        let _guard = lock.lock().await;

        let mut projects: Vec<Project> = store::load_list(&*self.store, PROJECT_INDEX).await?;
        let Some(project) = projects.iter_mut().find(|p| p.id == project_id) else {
            return Err(Error::not_found("project", project_id));
        };
        project.updated_at = Utc::now();
        store::save_list(&*self.store, PROJECT_INDEX, &projects).await
    }
}
