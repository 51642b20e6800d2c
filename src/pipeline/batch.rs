//! Batch generation
//!
//! Bulk application of the single-item generation contract: every approved
//! upstream item not yet consumed by the downstream stage gets one
//! generation task. The trigger returns immediately with counts; each task
//! persists its result (or its failure) independently, so one bad item
//! never aborts the rest. Re-running with no new approvals queues nothing.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::context::ContextCompiler;
use crate::error::{Error, Result};
use crate::generation::{DraftGenerator, GeneratedDraft, ImageRenderer};
use crate::store::{DocumentStore, ProjectLocks};
use crate::types::{ItemStatus, PipelineItem, Stage};

use super::items::ItemStore;

/// Immediate response to a batch trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceipt {
    /// Items queued for generation
    pub queued: usize,
    /// Approved upstream items already consumed by the downstream stage
    pub skipped: usize,
}

pub struct BatchRunner {
    store: Arc<dyn DocumentStore>,
    locks: Arc<ProjectLocks>,
    generator: Arc<dyn DraftGenerator>,
    image_renderer: Option<Arc<dyn ImageRenderer>>,
    handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    /// Upstream ids claimed by in-flight tasks. Items land here when their
    /// task is queued and leave once the result (or its error placeholder)
    /// is persisted, so overlapping triggers never queue the same item.
    in_flight: Arc<tokio::sync::Mutex<HashSet<String>>>,
}

fn flight_key(project_id: &str, stage: Stage, upstream_id: &str) -> String {
    format!("{}/{}/{}", project_id, stage, upstream_id)
}

impl BatchRunner {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        locks: Arc<ProjectLocks>,
        generator: Arc<dyn DraftGenerator>,
    ) -> Self {
        Self {
            store,
            locks,
            generator,
            image_renderer: None,
            handles: tokio::sync::Mutex::new(Vec::new()),
            in_flight: Arc::new(tokio::sync::Mutex::new(HashSet::new())),
        }
    }

    /// Attach an image renderer for storyboard frames
    pub fn with_image_renderer(mut self, renderer: Arc<dyn ImageRenderer>) -> Self {
        self.image_renderer = Some(renderer);
        self
    }

    fn items(&self) -> ItemStore {
        ItemStore::new(self.store.clone(), self.locks.clone())
    }

    fn compiler(&self) -> ContextCompiler {
        ContextCompiler::new(self.store.clone(), self.locks.clone())
    }

    /// Approved upstream items not yet consumed by a persisted downstream
    /// item. Set difference, no ordering or priority semantics. `trigger`
    /// additionally excludes items an in-flight task has already claimed.
    pub async fn eligible(
        &self,
        project_id: &str,
        stage: Stage,
    ) -> Result<(Vec<PipelineItem>, usize)> {
        let upstream_stage = stage
            .upstream()
            .ok_or_else(|| Error::validation(format!("{} has no upstream stage", stage)))?;

        let items = self.items();
        let upstream = items.list(project_id, upstream_stage).await?;
        let downstream = items.list(project_id, stage).await?;

        let consumed: HashSet<&str> = downstream
            .iter()
            .filter_map(|i| i.parent_id.as_deref())
            .collect();

        let approved: Vec<PipelineItem> = upstream
            .into_iter()
            .filter(|i| i.status == ItemStatus::Approved)
            .collect();
        let total_approved = approved.len();

        let eligible: Vec<PipelineItem> = approved
            .into_iter()
            .filter(|i| !consumed.contains(i.id.as_str()))
            .collect();
        let skipped = total_approved - eligible.len();

        Ok((eligible, skipped))
    }

    /// Trigger batch generation for a stage.
    ///
    /// Returns immediately; one task per eligible item runs in the
    /// background and persists its item (or an error placeholder) as it
    /// completes. Results are pollable through the normal item listing.
    pub async fn trigger(&self, project_id: &str, stage: Stage) -> Result<BatchReceipt> {
        let (eligible, mut skipped) = self.eligible(project_id, stage).await?;

        // Claim upstream ids before spawning. Results only become visible
        // once their task persists, so without the claim a second trigger
        // issued while tasks are still running would queue the same items.
        let candidates = eligible.len();
        let claimed: Vec<PipelineItem> = {
            let mut in_flight = self.in_flight.lock().await;
            eligible
                .into_iter()
                .filter(|i| in_flight.insert(flight_key(project_id, stage, &i.id)))
                .collect()
        };
        skipped += candidates - claimed.len();
        let queued = claimed.len();

        info!(
            "Batch {} generation for project {}: {} queued, {} already have {}s",
            stage, project_id, queued, skipped, stage
        );

        let mut handles = self.handles.lock().await;
        for upstream in claimed {
            let store = self.store.clone();
            let locks = self.locks.clone();
            let generator = self.generator.clone();
            let image_renderer = self.image_renderer.clone();
            let in_flight = self.in_flight.clone();
            let project_id = project_id.to_string();

            handles.push(tokio::spawn(async move {
                generate_one(
                    store,
                    locks,
                    generator,
                    image_renderer,
                    in_flight,
                    &project_id,
                    stage,
                    upstream,
                )
                .await;
            }));
        }

        Ok(BatchReceipt { queued, skipped })
    }

    /// Generate one fresh item synchronously (no upstream), e.g. strategies
    pub async fn generate_fresh(&self, project_id: &str, stage: Stage) -> Result<PipelineItem> {
        let ctx = self.compiler().compile(project_id).await?;
        let draft = self.generator.generate(&ctx, stage, None).await?;
        let item = item_from_draft(draft, None);
        self.items().add(project_id, stage, item).await
    }

    /// Regenerate an existing item in place: new content, status reset to
    /// pending, previous error cleared. The item's revision comments ride
    /// along in the compiled context.
    pub async fn regenerate(
        &self,
        project_id: &str,
        stage: Stage,
        item_id: &str,
    ) -> Result<PipelineItem> {
        let items = self.items();
        let current = items.get(project_id, stage, item_id).await?;

        let upstream = match (&current.parent_id, stage.upstream()) {
            (Some(parent_id), Some(upstream_stage)) => {
                // Unenforced referential integrity: a missing parent is fine
                items.get(project_id, upstream_stage, parent_id).await.ok()
            }
            _ => None,
        };

        let ctx = self.compiler().compile(project_id).await?;
        let draft = self
            .generator
            .generate(&ctx, stage, upstream.as_ref())
            .await?;
        items
            .iterate(
                project_id,
                stage,
                item_id,
                draft.title,
                draft.description,
                draft.extra,
            )
            .await
    }

    /// Await all in-flight batch tasks (used by tests and shutdown)
    pub async fn wait_for_completion(&self) {
        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        futures::future::join_all(handles).await;
    }
}

/// One batch task: compile fresh context, generate, persist.
/// A failure is recorded as an error placeholder item; the batch goes on.
async fn generate_one(
    store: Arc<dyn DocumentStore>,
    locks: Arc<ProjectLocks>,
    generator: Arc<dyn DraftGenerator>,
    image_renderer: Option<Arc<dyn ImageRenderer>>,
    in_flight: Arc<tokio::sync::Mutex<HashSet<String>>>,
    project_id: &str,
    stage: Stage,
    upstream: PipelineItem,
) {
    let key = flight_key(project_id, stage, &upstream.id);
    let items = ItemStore::new(store.clone(), locks.clone());
    let compiler = ContextCompiler::new(store, locks);

    let result = async {
        let ctx = compiler.compile(project_id).await?;
        let mut draft = generator.generate(&ctx, stage, Some(&upstream)).await?;

        if stage == Stage::Storyboard {
            if let Some(renderer) = &image_renderer {
                // Image failures degrade to a frame without art
                let prompt = format!("Storyboard frame: {}", draft.description);
                match renderer.render(&prompt).await {
                    Ok(payload) => {
                        draft
                            .extra
                            .insert("image_base64".to_string(), serde_json::Value::String(payload));
                    }
                    Err(e) => warn!("Image rendering failed for '{}': {}", draft.title, e),
                }
            }
        }

        Ok::<GeneratedDraft, Error>(draft)
    }
    .await;

    let item = match result {
        Ok(draft) => item_from_draft(draft, Some(upstream.id.clone())),
        Err(e) => {
            warn!(
                "Batch {} generation failed for upstream '{}': {}",
                stage, upstream.title, e
            );
            let mut item = PipelineItem::new(
                format!("{} (generation failed)", upstream.title),
                String::new(),
            )
            .with_parent(upstream.id.clone());
            item.error = Some(e.to_string());
            item
        }
    };

    if let Err(e) = items.add(project_id, stage, item).await {
        warn!("Failed to persist batch result for project {}: {}", project_id, e);
    }

    // Release the claim only after the write: until then the item is
    // visible neither in the store nor as claimable.
    in_flight.lock().await.remove(&key);
}

fn item_from_draft(draft: GeneratedDraft, parent_id: Option<String>) -> PipelineItem {
    let mut item = PipelineItem::new(draft.title, draft.description);
    item.parent_id = parent_id;
    item.extra = draft.extra;
    if let Some(raw) = draft.raw {
        // Degraded result: keep the unparsed provider output visible
        item.extra
            .insert("raw_response".to_string(), serde_json::Value::String(raw));
    }
    item
}
