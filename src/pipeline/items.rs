//! Pipeline item store
//!
//! CRUD over staged items. Every status transition records exactly one
//! ledger entry (action mapped from the new status); plain comments record
//! a `commented` entry. Items are never physically deleted.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::feedback::FeedbackLedger;
use crate::projects::ProjectRegistry;
use crate::store::{self, Category, DocumentStore, ProjectLocks};
use crate::types::{FeedbackAction, FeedbackEntry, ItemStatus, NewFeedback, PipelineItem, Stage};

pub struct ItemStore {
    store: Arc<dyn DocumentStore>,
    locks: Arc<ProjectLocks>,
    ledger: FeedbackLedger,
    projects: ProjectRegistry,
}

impl ItemStore {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<ProjectLocks>) -> Self {
        let ledger = FeedbackLedger::new(store.clone(), locks.clone());
        let projects = ProjectRegistry::new(store.clone(), locks.clone());
        Self {
            store,
            locks,
            ledger,
            projects,
        }
    }

    /// Bump the owning project's `updated_at`. Best effort: items for an
    /// unregistered project id are allowed (integrity is not enforced).
    async fn touch_project(&self, project_id: &str) {
        if let Err(e) = self.projects.touch(project_id).await {
            debug!("Skipping project touch for {}: {}", project_id, e);
        }
    }

    /// All items of a stage, oldest first
    pub async fn list(&self, project_id: &str, stage: Stage) -> Result<Vec<PipelineItem>> {
        let doc = store::doc_name(project_id, Category::Items(stage));
        store::load_list(&*self.store, &doc).await
    }

    /// Look up one item
    pub async fn get(&self, project_id: &str, stage: Stage, item_id: &str) -> Result<PipelineItem> {
        let items = self.list(project_id, stage).await?;
        items
            .into_iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| Error::not_found("item", item_id))
    }

    /// Append a new item to a stage
    pub async fn add(&self, project_id: &str, stage: Stage, item: PipelineItem) -> Result<PipelineItem> {
        let lock = self.locks.for_project(project_id).await;
        let _guard = lock.lock().await;

        let doc = store::doc_name(project_id, Category::Items(stage));
        let mut items: Vec<PipelineItem> = store::load_list(&*self.store, &doc).await?;
        items.push(item.clone());
        store::save_list(&*self.store, &doc, &items).await?;

        self.touch_project(project_id).await;
        info!("Added {} item '{}' to project {}", stage, item.title, project_id);
        Ok(item)
    }

    /// Change an item's status and record the decision in the ledger.
    ///
    /// Exactly one ledger entry per transition: approved/rejected/revision
    /// map to their action, anything else records `commented`. The optional
    /// comment is appended to the item and carried on the ledger entry.
    pub async fn set_status(
        &self,
        project_id: &str,
        stage: Stage,
        item_id: &str,
        status: ItemStatus,
        comment: Option<String>,
    ) -> Result<(PipelineItem, FeedbackEntry)> {
        let comment = normalize_comment(comment);
        let updated = {
            let lock = self.locks.for_project(project_id).await;
            let _guard = lock.lock().await;
            self.update_item(project_id, stage, item_id, |item| {
                item.status = status;
                if let Some(c) = &comment {
                    item.comments.push(c.clone());
                }
            })
            .await?
        };

        // Ledger append takes the project lock itself, so the item-document
        // critical section above must already be released.
        let entry = self
            .ledger
            .append(
                project_id,
                NewFeedback {
                    item_id: updated.id.clone(),
                    item_title: updated.title.clone(),
                    stage,
                    action: FeedbackAction::from_status(status),
                    comment,
                },
            )
            .await?;

        self.touch_project(project_id).await;
        Ok((updated, entry))
    }

    /// Record a comment without changing status. Empty and whitespace-only
    /// comments are rejected before any mutation.
    pub async fn add_comment(
        &self,
        project_id: &str,
        stage: Stage,
        item_id: &str,
        comment: &str,
    ) -> Result<(PipelineItem, FeedbackEntry)> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(Error::validation("comment must not be empty"));
        }

        let updated = {
            let lock = self.locks.for_project(project_id).await;
            let _guard = lock.lock().await;
            self.update_item(project_id, stage, item_id, |item| {
                item.comments.push(comment.to_string());
            })
            .await?
        };

        let entry = self
            .ledger
            .append(
                project_id,
                NewFeedback {
                    item_id: updated.id.clone(),
                    item_title: updated.title.clone(),
                    stage,
                    action: FeedbackAction::Commented,
                    comment: Some(comment.to_string()),
                },
            )
            .await?;

        self.touch_project(project_id).await;
        Ok((updated, entry))
    }

    /// Replace an item's content after regeneration and reset it to pending
    /// for a fresh review round. Clears any previous generation error.
    pub async fn iterate(
        &self,
        project_id: &str,
        stage: Stage,
        item_id: &str,
        title: String,
        description: String,
        extra: BTreeMap<String, serde_json::Value>,
    ) -> Result<PipelineItem> {
        let updated = {
            let lock = self.locks.for_project(project_id).await;
            let _guard = lock.lock().await;
            self.update_item(project_id, stage, item_id, |item| {
                item.title = title.clone();
                item.description = description.clone();
                item.extra = extra.clone();
                item.error = None;
                item.status = ItemStatus::Pending;
            })
            .await?
        };
        self.touch_project(project_id).await;
        Ok(updated)
    }

    /// Read-modify-write of one item in its stage document.
    /// Caller must hold the project lock.
    async fn update_item<F>(
        &self,
        project_id: &str,
        stage: Stage,
        item_id: &str,
        mutate: F,
    ) -> Result<PipelineItem>
    where
        F: FnOnce(&mut PipelineItem),
    {
        let doc = store::doc_name(project_id, Category::Items(stage));
        let mut items: Vec<PipelineItem> = store::load_list(&*self.store, &doc).await?;
        let Some(item) = items.iter_mut().find(|i| i.id == item_id) else {
            return Err(Error::not_found("item", item_id));
        };
        mutate(item);
        item.updated_at = Utc::now();
        let updated = item.clone();
        store::save_list(&*self.store, &doc, &items).await?;
        Ok(updated)
    }
}

fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}
