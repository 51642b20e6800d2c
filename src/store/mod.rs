//! Document store seam
//!
//! All persistent state lives in named whole-read/whole-write JSON documents:
//! `_projects` (global index) plus per-project documents for each category
//! (`{project_id}_strategies`, `{project_id}_feedback`, ...). The store is an
//! injected trait so the core runs against an in-memory fake in tests and a
//! flat-file backend in the binary.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::types::Stage;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Per-project document categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Items(Stage),
    Feedback,
    Patterns,
}

/// Name of the global project index document
pub const PROJECT_INDEX: &str = "_projects";

/// Document name for a project-scoped category
pub fn doc_name(project_id: &str, category: Category) -> String {
    let suffix = match category {
        Category::Items(stage) => stage.doc_suffix(),
        Category::Feedback => "feedback",
        Category::Patterns => "patterns",
    };
    format!("{}_{}", project_id, suffix)
}

/// Whole-document key-value store. No partial updates, no cross-document
/// transactions; callers serialize read-modify-write through `ProjectLocks`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document, `None` if it was never written
    async fn read(&self, name: &str) -> Result<Option<serde_json::Value>>;

    /// Overwrite a document
    async fn write(&self, name: &str, doc: serde_json::Value) -> Result<()>;
}

/// Read a list document, defaulting to empty when absent
pub async fn load_list<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    name: &str,
) -> Result<Vec<T>> {
    match store.read(name).await? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(Vec::new()),
    }
}

/// Overwrite a list document
pub async fn save_list<T: Serialize>(
    store: &dyn DocumentStore,
    name: &str,
    items: &[T],
) -> Result<()> {
    store.write(name, serde_json::to_value(items)?).await
}

/// Per-project serialization boundary.
///
/// Every read-modify-write of a project's documents runs under that
/// project's async mutex, preventing lost updates from concurrent requests.
/// Generation calls run outside the lock; only document mutation holds it.
#[derive(Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the mutex guarding a project's documents
    pub async fn for_project(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
