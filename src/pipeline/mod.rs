//! Pipeline items and batch generation
//!
//! Staged creative artifacts (strategy -> concept -> script -> storyboard),
//! each stage gated on human approval before the next stage consumes it.

pub mod batch;
pub mod items;

pub use batch::{BatchReceipt, BatchRunner};
pub use items::ItemStore;
