//! Studio facade
//!
//! Bundles the per-project services over one document store and one lock
//! table. The batch runner is attached separately because it needs a
//! generation provider; everything else works without one.

use std::sync::Arc;

use crate::context::ContextCompiler;
use crate::feedback::FeedbackLedger;
use crate::generation::DraftGenerator;
use crate::pipeline::{BatchRunner, ItemStore};
use crate::projects::ProjectRegistry;
use crate::store::{DocumentStore, ProjectLocks};

pub struct Studio {
    pub projects: ProjectRegistry,
    pub ledger: FeedbackLedger,
    pub items: ItemStore,
    pub compiler: ContextCompiler,
    store: Arc<dyn DocumentStore>,
    locks: Arc<ProjectLocks>,
}

impl Studio {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let locks = Arc::new(ProjectLocks::new());
        Self {
            projects: ProjectRegistry::new(store.clone(), locks.clone()),
            ledger: FeedbackLedger::new(store.clone(), locks.clone()),
            items: ItemStore::new(store.clone(), locks.clone()),
            compiler: ContextCompiler::new(store.clone(), locks.clone()),
            store,
            locks,
        }
    }

    /// Build a batch runner over the same store with the given generator
    pub fn batch_runner(&self, generator: Arc<dyn DraftGenerator>) -> BatchRunner {
        BatchRunner::new(self.store.clone(), self.locks.clone(), generator)
    }
}
