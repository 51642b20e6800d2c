//! Context compiler
//!
//! Assembles the single payload handed to the generation caller: project
//! metadata, the full decision ledger, learned patterns, freshly detected
//! contradictions, and the current items of every stage. Always built fresh
//! so any decision made since the last call is visible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;
use crate::feedback::{detect_contradictions, FeedbackLedger};
use crate::pipeline::ItemStore;
use crate::projects::ProjectRegistry;
use crate::store::{DocumentStore, ProjectLocks};
use crate::types::{
    Contradiction, FeedbackAction, FeedbackEntry, PatternSummary, PipelineItem, Project, Stage,
};

/// Derived counts over the compiled context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSummary {
    pub total_feedback: usize,
    pub approved: usize,
    pub rejected: usize,
    pub revisions: usize,
    pub comments: usize,
    pub contradictions: usize,
    pub rules: usize,
}

/// The full memory payload for one generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewContext {
    pub project: Project,
    pub feedback: Vec<FeedbackEntry>,
    pub patterns: PatternSummary,
    pub contradictions: Vec<Contradiction>,
    /// Current items per stage, keyed by stage name
    pub items: BTreeMap<Stage, Vec<PipelineItem>>,
    pub summary: ContextSummary,
}

pub struct ContextCompiler {
    projects: ProjectRegistry,
    ledger: FeedbackLedger,
    items: ItemStore,
}

impl ContextCompiler {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<ProjectLocks>) -> Self {
        Self {
            projects: ProjectRegistry::new(store.clone(), locks.clone()),
            ledger: FeedbackLedger::new(store.clone(), locks.clone()),
            items: ItemStore::new(store, locks),
        }
    }

    /// Compile the context for a project. Fails with `NotFound` for an
    /// unknown project; everything else defaults to empty.
    pub async fn compile(&self, project_id: &str) -> Result<ReviewContext> {
        let project = self.projects.get(project_id).await?;
        let feedback = self.ledger.list(project_id).await?;
        let patterns = self.ledger.patterns(project_id).await?;
        let contradictions = detect_contradictions(&feedback);

        let mut items = BTreeMap::new();
        for stage in Stage::ALL {
            items.insert(stage, self.items.list(project_id, stage).await?);
        }

        let summary = summarize(&feedback, &patterns, &contradictions);

        Ok(ReviewContext {
            project,
            feedback,
            patterns,
            contradictions,
            items,
            summary,
        })
    }
}

fn summarize(
    feedback: &[FeedbackEntry],
    patterns: &PatternSummary,
    contradictions: &[Contradiction],
) -> ContextSummary {
    let count = |action: FeedbackAction| feedback.iter().filter(|e| e.action == action).count();
    ContextSummary {
        total_feedback: feedback.len(),
        approved: count(FeedbackAction::Approved),
        rejected: count(FeedbackAction::Rejected),
        revisions: count(FeedbackAction::Revision),
        comments: count(FeedbackAction::Commented),
        contradictions: contradictions.len(),
        rules: patterns.rules.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::NewFeedback;

    async fn setup() -> (ContextCompiler, ProjectRegistry, FeedbackLedger, String) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let locks = Arc::new(ProjectLocks::new());
        let projects = ProjectRegistry::new(store.clone(), locks.clone());
        let ledger = FeedbackLedger::new(store.clone(), locks.clone());
        let compiler = ContextCompiler::new(store, locks);
        let project = projects.create("P", "warm, direct").await.unwrap();
        (compiler, projects, ledger, project.id)
    }

    fn decision(action: FeedbackAction, comment: Option<&str>) -> NewFeedback {
        NewFeedback {
            item_id: "i1".to_string(),
            item_title: "Hook A".to_string(),
            stage: Stage::Concept,
            action,
            comment: comment.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn test_compile_unknown_project_fails() {
        let (compiler, _, _, _) = setup().await;
        assert!(compiler.compile("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_compile_empty_project() {
        let (compiler, _, _, id) = setup().await;
        let ctx = compiler.compile(&id).await.unwrap();
        assert!(ctx.feedback.is_empty());
        assert_eq!(ctx.summary.total_feedback, 0);
        assert_eq!(ctx.items.len(), 4);
        assert!(ctx.items[&Stage::Strategy].is_empty());
    }

    #[tokio::test]
    async fn test_summary_counts_match_ledger() {
        let (compiler, _, ledger, id) = setup().await;
        ledger.append(&id, decision(FeedbackAction::Approved, None)).await.unwrap();
        ledger.append(&id, decision(FeedbackAction::Rejected, None)).await.unwrap();
        ledger
            .append(&id, decision(FeedbackAction::Revision, Some("tighter hook")))
            .await
            .unwrap();
        ledger
            .append(&id, decision(FeedbackAction::Commented, Some("note")))
            .await
            .unwrap();

        let ctx = compiler.compile(&id).await.unwrap();
        assert_eq!(ctx.summary.total_feedback, 4);
        assert_eq!(ctx.summary.approved, 1);
        assert_eq!(ctx.summary.rejected, 1);
        assert_eq!(ctx.summary.revisions, 1);
        assert_eq!(ctx.summary.comments, 1);
        assert_eq!(ctx.summary.rules, 1);
        // approve then reject on the same item is a direct contradiction
        assert_eq!(ctx.summary.contradictions, 1);
        assert_eq!(ctx.contradictions.len(), 1);
    }

    #[tokio::test]
    async fn test_compile_is_fresh_not_cached() {
        let (compiler, _, ledger, id) = setup().await;
        let before = compiler.compile(&id).await.unwrap();
        assert_eq!(before.summary.total_feedback, 0);

        ledger.append(&id, decision(FeedbackAction::Approved, None)).await.unwrap();
        let after = compiler.compile(&id).await.unwrap();
        assert_eq!(after.summary.total_feedback, 1);
    }
}
