//! Batch import/export reconciliation
//!
//! The classifier decides what is legal for each external record; the
//! orchestrator drives preview and apply passes over whole batches.

use async_trait::async_trait;
use uuid::Uuid;

pub mod classifier;
pub mod orchestrator;

pub use classifier::{ConflictClassifier, ConflictKind};
pub use orchestrator::{ImportOrchestrator, ImportPreview, ImportSummary};

/// Lookup seam for resolving approver names carried in batch records to
/// actor ids. The staff directory lives outside this core.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn resolve_by_name(&self, name: &str) -> Option<Uuid>;
}

/// Default directory: resolves nothing, so the acting importer is recorded
/// as the decision maker.
pub struct NullDirectory;

#[async_trait]
impl ActorDirectory for NullDirectory {
    async fn resolve_by_name(&self, _name: &str) -> Option<Uuid> {
        None
    }
}
