//! Flat-file document store
//!
//! One pretty-printed JSON file per document under the data directory,
//! e.g. `~/.local/share/storyloop/projects/p1_feedback.json`.

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::DocumentStore;
use crate::error::Result;

pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a store at the default data location
    pub fn new() -> Result<Self> {
        let base_dir = crate::config::data_dir()?.join("projects");
        Self::with_dir(base_dir)
    }

    /// Create a store at a custom directory
    pub fn with_dir(base_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create store directory {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", name))
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn read(&self, name: &str) -> Result<Option<serde_json::Value>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn write(&self, name: &str, doc: serde_json::Value) -> Result<()> {
        let path = self.path_for(name);
        let content = serde_json::to_string_pretty(&doc)?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote document {}", name);
        Ok(())
    }
}
