//! In-memory document store for tests and embedded use

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::DocumentStore;
use crate::error::Result;

/// HashMap-backed store; documents are cloned on read
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents ever written (for tests)
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, name: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.docs.read().await.get(name).cloned())
    }

    async fn write(&self, name: &str, doc: serde_json::Value) -> Result<()> {
        self.docs.write().await.insert(name.to_string(), doc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_absent_is_none() {
        let store = MemoryStore::new();
        assert!(store.read("p1_feedback").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryStore::new();
        store.write("p1_feedback", json!([1, 2])).await.unwrap();
        assert_eq!(store.read("p1_feedback").await.unwrap(), Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_write_overwrites_whole_document() {
        let store = MemoryStore::new();
        store.write("doc", json!({"a": 1})).await.unwrap();
        store.write("doc", json!({"b": 2})).await.unwrap();
        assert_eq!(store.read("doc").await.unwrap(), Some(json!({"b": 2})));
    }
}
