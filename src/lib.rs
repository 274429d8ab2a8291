//! Account-opening backend core
//!
//! Customers submit onboarding data, staff review and approve or reject it,
//! and approved records can later be corrected, exported and re-imported
//! across deployments. This crate owns the submission aggregate's
//! transactional lifecycle:
//!
//! - normalizing loosely-shaped input into one canonical record
//! - creating and editing the aggregate inside single transactions
//! - the append-only audit trail for post-approval edits
//! - reconciling external batches against existing records without creating
//!   duplicates or silently destroying data
//!
//! HTTP routing, authentication, document rendering and message delivery are
//! external collaborators; see the `notify` and `import` seams.

// Error taxonomy shared by every operation
pub mod error;

// Actor context and the access policy table
pub mod access;

// Entity models for the submission aggregate
pub mod models;

// Alias resolution and value parsing at the ingestion boundary
pub mod normalize;

// Declarative field table driving the edit path
pub mod fields;

// Connection management, repositories and the transactional writer
pub mod database;

// Batch reconciliation: classifier and orchestrator
pub mod import;

// Ephemeral TTL-bound batch progress
pub mod progress;

// Fire-and-forget notification trigger contract
pub mod notify;

pub use access::{Action, Actor, ActorRole};
pub use database::{
    ActivityLogRepository, AuditRepository, CreateOutcome, DatabaseConfig, DatabaseManager,
    DeleteOutcome, EditOutcome, SubmissionRepository, SubmissionWriter,
};
pub use error::{OnboardingError, OnboardingResult};
pub use import::{ConflictClassifier, ConflictKind, ImportOrchestrator, ImportPreview, ImportSummary};
pub use models::{Submission, SubmissionAggregate, SubmissionStatus};
pub use normalize::{normalize_record, NormalizedInput};
pub use progress::{ProgressLedger, ProgressSnapshot};
