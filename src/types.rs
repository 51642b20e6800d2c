//! Shared types used across modules
//!
//! The domain data model for the review pipeline: projects, staged pipeline
//! items, the feedback ledger, learned patterns, and detected contradictions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four ordered pipeline stages an item can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Strategy,
    Concept,
    Script,
    Storyboard,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 4] = [
        Stage::Strategy,
        Stage::Concept,
        Stage::Script,
        Stage::Storyboard,
    ];

    /// The stage whose approved items feed this stage, if any
    pub fn upstream(&self) -> Option<Stage> {
        match self {
            Stage::Strategy => None,
            Stage::Concept => Some(Stage::Strategy),
            Stage::Script => Some(Stage::Concept),
            Stage::Storyboard => Some(Stage::Script),
        }
    }

    /// The stage fed by this stage's approved items, if any
    pub fn downstream(&self) -> Option<Stage> {
        match self {
            Stage::Strategy => Some(Stage::Concept),
            Stage::Concept => Some(Stage::Script),
            Stage::Script => Some(Stage::Storyboard),
            Stage::Storyboard => None,
        }
    }

    /// Document category suffix for this stage ("strategies", "concepts", ...)
    pub fn doc_suffix(&self) -> &'static str {
        match self {
            Stage::Strategy => "strategies",
            Stage::Concept => "concepts",
            Stage::Script => "scripts",
            Stage::Storyboard => "storyboards",
        }
    }

    /// Parse from a lowercase stage name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strategy" => Some(Stage::Strategy),
            "concept" => Some(Stage::Concept),
            "script" => Some(Stage::Script),
            "storyboard" => Some(Stage::Storyboard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Strategy => write!(f, "strategy"),
            Stage::Concept => write!(f, "concept"),
            Stage::Script => write!(f, "script"),
            Stage::Storyboard => write!(f, "storyboard"),
        }
    }
}

/// Review status of a pipeline item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
    Revision,
}

impl ItemStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(ItemStatus::Pending),
            "approved" => Some(ItemStatus::Approved),
            "rejected" => Some(ItemStatus::Rejected),
            "revision" => Some(ItemStatus::Revision),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "pending"),
            ItemStatus::Approved => write!(f, "approved"),
            ItemStatus::Rejected => write!(f, "rejected"),
            ItemStatus::Revision => write!(f, "revision"),
        }
    }
}

/// Action recorded in the feedback ledger for a human decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackAction {
    Approved,
    Rejected,
    Revision,
    Commented,
}

impl FeedbackAction {
    /// Map a status transition to the ledger action it records.
    /// Anything other than approved/rejected/revision is a plain comment.
    pub fn from_status(status: ItemStatus) -> Self {
        match status {
            ItemStatus::Approved => FeedbackAction::Approved,
            ItemStatus::Rejected => FeedbackAction::Rejected,
            ItemStatus::Revision => FeedbackAction::Revision,
            ItemStatus::Pending => FeedbackAction::Commented,
        }
    }
}

impl std::fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackAction::Approved => write!(f, "approved"),
            FeedbackAction::Rejected => write!(f, "rejected"),
            FeedbackAction::Revision => write!(f, "revision"),
            FeedbackAction::Commented => write!(f, "commented"),
        }
    }
}

/// A review project owning all per-project documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Free-form brand/tone context injected into every generation prompt
    #[serde(default)]
    pub brand_context: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A staged creative artifact under review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub comments: Vec<String>,
    /// Upstream item this was derived from (concept -> strategy, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Set when batch generation for this item failed; cleared on iteration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stage-specific fields (script body, storyboard image data, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineItem {
    /// Construct a fresh pending item
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            status: ItemStatus::Pending,
            comments: Vec::new(),
            parent_id: None,
            error: None,
            extra: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the upstream item this one was derived from
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// One immutable entry in a project's feedback ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: String,
    pub item_id: String,
    pub item_title: String,
    pub stage: Stage,
    pub action: FeedbackAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A new decision to append, before the ledger assigns id/timestamp
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub item_id: String,
    pub item_title: String,
    pub stage: Stage,
    pub action: FeedbackAction,
    pub comment: Option<String>,
}

/// Ledger entry projected into the approved/rejected pattern lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub title: String,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A rule learned from a revision request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Title of the item whose revision produced this rule
    pub from: String,
    pub rule: String,
    pub timestamp: DateTime<Utc>,
}

/// Derived projection of the ledger, fully rebuilt on every append
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    #[serde(default)]
    pub approved: Vec<PatternEntry>,
    #[serde(default)]
    pub rejected: Vec<PatternEntry>,
    #[serde(default)]
    pub rules: Vec<PatternRule>,
}

/// Kind of detected feedback conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContradictionKind {
    Direct,
    Thematic,
}

impl std::fmt::Display for ContradictionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContradictionKind::Direct => write!(f, "direct"),
            ContradictionKind::Thematic => write!(f, "thematic"),
        }
    }
}

/// A detected conflict between two feedback entries.
/// Ephemeral: recomputed on demand, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContradictionKind,
    pub entry1: FeedbackEntry,
    pub entry2: FeedbackEntry,
    pub description: String,
}
