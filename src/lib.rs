//! Storyloop - content-review pipeline with feedback memory
//!
//! Orchestrates text and image generation for staged creative work
//! (strategy -> concept -> script -> storyboard), persists every human
//! decision as permanent per-project state, and re-injects that decision
//! history into subsequent generation calls:
//! - Append-only feedback ledger per project
//! - Learned preference patterns recomputed on every decision
//! - Direct and thematic contradiction detection
//! - Bounded context payload compiled fresh for each generation call
//! - Idempotent batch generation with per-item failure isolation
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use storyloop::store::MemoryStore;
//! use storyloop::Studio;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let studio = Studio::new(Arc::new(MemoryStore::new()));
//!     let project = studio.projects.create("Spring Campaign", "warm, direct").await?;
//!     let ctx = studio.compiler.compile(&project.id).await?;
//!     println!("{} decisions on record", ctx.summary.total_feedback);
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod types;
pub mod error;
pub mod store;
pub mod config;
pub mod projects;
pub mod feedback;
pub mod context;
pub mod pipeline;
pub mod generation;
pub mod studio;
pub mod cli;

// Re-export commonly used types for convenience
pub use context::{ContextCompiler, ReviewContext};
pub use error::{Error, Result};
pub use feedback::{detect_contradictions, recompute_patterns, FeedbackLedger};
pub use pipeline::{BatchReceipt, BatchRunner, ItemStore};
pub use projects::ProjectRegistry;
pub use studio::Studio;
pub use types::{
    Contradiction, ContradictionKind, FeedbackAction, FeedbackEntry, ItemStatus, PatternSummary,
    PipelineItem, Project, Stage,
};

pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
