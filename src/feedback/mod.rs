//! Feedback memory
//!
//! The append-only decision ledger, the pattern learner that projects it
//! into learned preferences, and the contradiction detector that flags
//! conflicting feedback. This is the memory that generation calls consume.

pub mod contradictions;
pub mod ledger;
pub mod patterns;

pub use contradictions::detect_contradictions;
pub use ledger::FeedbackLedger;
pub use patterns::recompute_patterns;
