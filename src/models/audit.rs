//! Audit trail entries
//!
//! One row per field-level change made during a post-approval edit.
//! Rows are append-only: no update or delete path exists anywhere in the
//! crate, and the schema grants would mirror that in production.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable record of one field-level change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub reason: Option<String>,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// History view returned by `AuditRepository::get_history`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionHistory {
    /// Approver currently on the submission row
    pub current_approver: Option<Uuid>,
    /// Approver frozen at the first post-approval edit
    pub original_approver: Option<Uuid>,
    /// Entries ordered most-recent-first
    pub entries: Vec<AuditEntry>,
}
