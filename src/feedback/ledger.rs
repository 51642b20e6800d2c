//! Feedback ledger - append-only record of human decisions
//!
//! Entries are never edited or removed; insertion order is meaningful
//! (later entries represent more recent intent). Every append synchronously
//! recomputes and persists the project's pattern summary so the stored
//! patterns are always consistent with the ledger.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::projects::ProjectRegistry;
use crate::store::{self, Category, DocumentStore, ProjectLocks};
use crate::types::{FeedbackEntry, NewFeedback, PatternSummary};

use super::patterns::recompute_patterns;

pub struct FeedbackLedger {
    store: Arc<dyn DocumentStore>,
    locks: Arc<ProjectLocks>,
    projects: ProjectRegistry,
}

impl FeedbackLedger {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<ProjectLocks>) -> Self {
        let projects = ProjectRegistry::new(store.clone(), locks.clone());
        Self {
            store,
            locks,
            projects,
        }
    }

    /// Append a decision, assigning id and timestamp, and recompute patterns.
    ///
    /// The ledger append and the pattern write happen under the project
    /// lock, so a successful return means both documents agree. The owning
    /// project's `updated_at` is bumped best effort (unregistered project
    /// ids are allowed).
    pub async fn append(&self, project_id: &str, new: NewFeedback) -> Result<FeedbackEntry> {
        let entry = FeedbackEntry {
            id: uuid::Uuid::new_v4().to_string(),
            item_id: new.item_id,
            item_title: new.item_title,
            stage: new.stage,
            action: new.action,
            comment: new.comment,
            timestamp: Utc::now(),
        };

        let lock = self.locks.for_project(project_id).await;
        let _guard = lock.lock().await;

        let feedback_doc = store::doc_name(project_id, Category::Feedback);
        let mut entries: Vec<FeedbackEntry> =
            store::load_list(&*self.store, &feedback_doc).await?;
        entries.push(entry.clone());
        store::save_list(&*self.store, &feedback_doc, &entries).await?;

        let summary = recompute_patterns(&entries);
        let patterns_doc = store::doc_name(project_id, Category::Patterns);
        self.store
            .write(&patterns_doc, serde_json::to_value(&summary)?)
            .await?;

        if let Err(e) = self.projects.touch(project_id).await {
            debug!("Skipping project touch for {}: {}", project_id, e);
        }

        info!(
            "Recorded {} feedback on '{}' ({} entries total)",
            entry.action, entry.item_title, entries.len()
        );
        Ok(entry)
    }

    /// All entries for a project, oldest first
    pub async fn list(&self, project_id: &str) -> Result<Vec<FeedbackEntry>> {
        let doc = store::doc_name(project_id, Category::Feedback);
        store::load_list(&*self.store, &doc).await
    }

    /// The stored pattern summary, empty if no feedback was ever recorded
    pub async fn patterns(&self, project_id: &str) -> Result<PatternSummary> {
        let doc = store::doc_name(project_id, Category::Patterns);
        match self.store.read(&doc).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(PatternSummary::default()),
        }
    }
}
