//! Batch generation tests: stage gating, idempotence, and per-item
//! failure isolation, run against fake generators.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use storyloop::context::ReviewContext;
use storyloop::generation::{DraftGenerator, GeneratedDraft};
use storyloop::store::{FileStore, MemoryStore};
use storyloop::types::PipelineItem;
use storyloop::{Error, ItemStatus, Result, Stage, Studio};

/// Counts calls and derives drafts from the upstream title.
/// Fails for any upstream whose title contains `fail_marker`; sleeps for
/// `delay` first so tests can observe in-flight batches.
struct FakeGenerator {
    calls: AtomicUsize,
    fail_marker: Option<String>,
    delay: Option<Duration>,
}

impl FakeGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_marker: None,
            delay: None,
        }
    }

    fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::new()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DraftGenerator for FakeGenerator {
    async fn generate(
        &self,
        _ctx: &ReviewContext,
        stage: Stage,
        upstream: Option<&PipelineItem>,
    ) -> Result<GeneratedDraft> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let (Some(marker), Some(item)) = (&self.fail_marker, upstream) {
            if item.title.contains(marker) {
                return Err(Error::generation("provider exploded"));
            }
        }

        let title = match upstream {
            Some(item) => format!("{} for {}", stage, item.title),
            None => format!("fresh {}", stage),
        };
        Ok(GeneratedDraft {
            title,
            description: "generated".to_string(),
            extra: BTreeMap::new(),
            raw: None,
        })
    }
}

async fn seed_concepts(studio: &Studio, project_id: &str) -> anyhow::Result<Vec<PipelineItem>> {
    let mut items = Vec::new();
    for (title, status) in [
        ("A", ItemStatus::Approved),
        ("B", ItemStatus::Approved),
        ("C", ItemStatus::Pending),
    ] {
        let item = studio
            .items
            .add(project_id, Stage::Concept, PipelineItem::new(title, "concept"))
            .await?;
        if status == ItemStatus::Approved {
            studio
                .items
                .set_status(project_id, Stage::Concept, &item.id, status, None)
                .await?;
        }
        items.push(item);
    }
    Ok(items)
}

#[tokio::test]
async fn batch_generates_only_for_approved_upstream() -> anyhow::Result<()> {
    let studio = Studio::new(Arc::new(MemoryStore::new()));
    let project = studio.projects.create("P", "").await?;
    let concepts = seed_concepts(&studio, &project.id).await?;

    let generator = Arc::new(FakeGenerator::new());
    let runner = studio.batch_runner(generator.clone());

    let receipt = runner.trigger(&project.id, Stage::Script).await?;
    assert_eq!(receipt.queued, 2);
    assert_eq!(receipt.skipped, 0);
    runner.wait_for_completion().await;

    let scripts = studio.items.list(&project.id, Stage::Script).await?;
    assert_eq!(scripts.len(), 2);
    let parent_ids: Vec<_> = scripts.iter().filter_map(|s| s.parent_id.clone()).collect();
    assert!(parent_ids.contains(&concepts[0].id));
    assert!(parent_ids.contains(&concepts[1].id));
    // pending concept C produced nothing
    assert!(!parent_ids.contains(&concepts[2].id));
    assert!(scripts.iter().all(|s| s.status == ItemStatus::Pending));
    Ok(())
}

#[tokio::test]
async fn rerunning_a_batch_is_idempotent() -> anyhow::Result<()> {
    let studio = Studio::new(Arc::new(MemoryStore::new()));
    let project = studio.projects.create("P", "").await?;
    seed_concepts(&studio, &project.id).await?;

    let generator = Arc::new(FakeGenerator::new());
    let runner = studio.batch_runner(generator.clone());

    let first = runner.trigger(&project.id, Stage::Script).await?;
    assert_eq!(first.queued, 2);
    runner.wait_for_completion().await;

    let second = runner.trigger(&project.id, Stage::Script).await?;
    assert_eq!(second.queued, 0, "no new approvals, nothing to do");
    assert_eq!(second.skipped, 2, "response indicates items already have scripts");
    runner.wait_for_completion().await;

    assert_eq!(studio.items.list(&project.id, Stage::Script).await?.len(), 2);
    assert_eq!(generator.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn overlapping_triggers_do_not_duplicate_work() -> anyhow::Result<()> {
    let studio = Studio::new(Arc::new(MemoryStore::new()));
    let project = studio.projects.create("P", "").await?;
    seed_concepts(&studio, &project.id).await?;

    let generator = Arc::new(FakeGenerator::slow(Duration::from_millis(200)));
    let runner = studio.batch_runner(generator.clone());

    // second trigger lands while the first batch's tasks are still running
    // and nothing is persisted yet
    let first = runner.trigger(&project.id, Stage::Script).await?;
    let second = runner.trigger(&project.id, Stage::Script).await?;
    assert_eq!(first.queued, 2);
    assert_eq!(second.queued, 0, "in-flight items must not be queued again");
    assert_eq!(second.skipped, 2);
    runner.wait_for_completion().await;

    assert_eq!(studio.items.list(&project.id, Stage::Script).await?.len(), 2);
    assert_eq!(generator.calls(), 2);

    // after completion the persisted scripts take over from the claims
    let third = runner.trigger(&project.id, Stage::Script).await?;
    assert_eq!(third.queued, 0);
    assert_eq!(third.skipped, 2);
    Ok(())
}

#[tokio::test]
async fn new_approval_between_runs_queues_only_the_new_item() -> anyhow::Result<()> {
    let studio = Studio::new(Arc::new(MemoryStore::new()));
    let project = studio.projects.create("P", "").await?;
    let concepts = seed_concepts(&studio, &project.id).await?;

    let runner = studio.batch_runner(Arc::new(FakeGenerator::new()));
    runner.trigger(&project.id, Stage::Script).await?;
    runner.wait_for_completion().await;

    // C gets approved after the first run
    studio
        .items
        .set_status(&project.id, Stage::Concept, &concepts[2].id, ItemStatus::Approved, None)
        .await?;

    let receipt = runner.trigger(&project.id, Stage::Script).await?;
    assert_eq!(receipt.queued, 1);
    assert_eq!(receipt.skipped, 2);
    runner.wait_for_completion().await;

    assert_eq!(studio.items.list(&project.id, Stage::Script).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn one_failed_item_does_not_abort_the_batch() -> anyhow::Result<()> {
    let studio = Studio::new(Arc::new(MemoryStore::new()));
    let project = studio.projects.create("P", "").await?;

    for title in ["good one", "bad one", "another good one"] {
        let item = studio
            .items
            .add(&project.id, Stage::Concept, PipelineItem::new(title, "concept"))
            .await?;
        studio
            .items
            .set_status(&project.id, Stage::Concept, &item.id, ItemStatus::Approved, None)
            .await?;
    }

    let runner = studio.batch_runner(Arc::new(FakeGenerator::failing_on("bad")));
    let receipt = runner.trigger(&project.id, Stage::Script).await?;
    assert_eq!(receipt.queued, 3);
    runner.wait_for_completion().await;

    let scripts = studio.items.list(&project.id, Stage::Script).await?;
    assert_eq!(scripts.len(), 3, "failure is recorded, not dropped");

    let failed: Vec<_> = scripts.iter().filter(|s| s.error.is_some()).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].error.as_deref().unwrap().contains("provider exploded"));

    // the failed placeholder still consumes its upstream: no silent retry
    let rerun = runner.trigger(&project.id, Stage::Script).await?;
    assert_eq!(rerun.queued, 0);
    Ok(())
}

#[tokio::test]
async fn strategy_stage_has_no_upstream_to_batch() -> anyhow::Result<()> {
    let studio = Studio::new(Arc::new(MemoryStore::new()));
    let project = studio.projects.create("P", "").await?;

    let runner = studio.batch_runner(Arc::new(FakeGenerator::new()));
    assert!(runner.trigger(&project.id, Stage::Strategy).await.is_err());

    let item = runner.generate_fresh(&project.id, Stage::Strategy).await?;
    assert_eq!(item.title, "fresh strategy");
    assert!(item.parent_id.is_none());
    Ok(())
}

#[tokio::test]
async fn regenerate_resets_item_for_a_new_review_round() -> anyhow::Result<()> {
    let studio = Studio::new(Arc::new(MemoryStore::new()));
    let project = studio.projects.create("P", "").await?;

    let concept = studio
        .items
        .add(&project.id, Stage::Concept, PipelineItem::new("A", "concept"))
        .await?;
    studio
        .items
        .set_status(&project.id, Stage::Concept, &concept.id, ItemStatus::Approved, None)
        .await?;

    let runner = studio.batch_runner(Arc::new(FakeGenerator::new()));
    runner.trigger(&project.id, Stage::Script).await?;
    runner.wait_for_completion().await;

    let script = studio.items.list(&project.id, Stage::Script).await?.remove(0);
    studio
        .items
        .set_status(
            &project.id,
            Stage::Script,
            &script.id,
            ItemStatus::Revision,
            Some("shorter please".to_string()),
        )
        .await?;

    let updated = runner.regenerate(&project.id, Stage::Script, &script.id).await?;
    assert_eq!(updated.status, ItemStatus::Pending);
    assert!(updated.error.is_none());
    // the revision decision stays on the ledger
    let ledger = studio.ledger.list(&project.id).await?;
    assert!(ledger
        .iter()
        .any(|e| e.comment.as_deref() == Some("shorter please")));
    Ok(())
}

#[tokio::test]
async fn whole_flow_persists_through_the_file_store() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let project_id;
    {
        let store = Arc::new(FileStore::with_dir(dir.path().to_path_buf())?);
        let studio = Studio::new(store);
        let project = studio.projects.create("P", "dry humor").await?;
        project_id = project.id.clone();

        let concept = studio
            .items
            .add(&project_id, Stage::Concept, PipelineItem::new("A", "concept"))
            .await?;
        studio
            .items
            .set_status(&project_id, Stage::Concept, &concept.id, ItemStatus::Approved, None)
            .await?;

        let runner = studio.batch_runner(Arc::new(FakeGenerator::new()));
        runner.trigger(&project_id, Stage::Script).await?;
        runner.wait_for_completion().await;
    }

    // Fresh handles over the same directory see everything
    let studio = Studio::new(Arc::new(FileStore::with_dir(dir.path().to_path_buf())?));
    let ctx = studio.compiler.compile(&project_id).await?;
    assert_eq!(ctx.project.brand_context, "dry humor");
    assert_eq!(ctx.items[&Stage::Concept].len(), 1);
    assert_eq!(ctx.items[&Stage::Script].len(), 1);
    assert_eq!(ctx.summary.approved, 1);
    Ok(())
}
