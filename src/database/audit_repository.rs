//! Audit trail repository
//!
//! Insert happens only inside writer transactions; reads serve the history
//! view. There is deliberately no update or delete here.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::{OnboardingError, OnboardingResult};
use crate::models::{AuditEntry, SubmissionHistory};

/// One staged field-level change, not yet persisted
#[derive(Debug, Clone)]
pub struct AuditDraft {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one row per draft inside the caller's transaction.
    pub async fn insert_entries(
        tx: &mut Transaction<'_, Postgres>,
        submission_id: Uuid,
        drafts: &[AuditDraft],
        actor_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Vec<AuditEntry>, sqlx::Error> {
        let mut entries = Vec::with_capacity(drafts.len());
        let now = Utc::now();

        for draft in drafts {
            let id = Uuid::new_v4();
            sqlx::query(
                r#"INSERT INTO audit_entries
                       (id, submission_id, field, old_value, new_value, reason, actor_id, created_at)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
            )
            .bind(id)
            .bind(submission_id)
            .bind(&draft.field)
            .bind(&draft.old_value)
            .bind(&draft.new_value)
            .bind(reason)
            .bind(actor_id)
            .bind(now)
            .execute(&mut **tx)
            .await?;

            entries.push(AuditEntry {
                id,
                submission_id,
                field: draft.field.clone(),
                old_value: draft.old_value.clone(),
                new_value: draft.new_value.clone(),
                reason: reason.map(String::from),
                actor_id,
                created_at: now,
            });
        }

        Ok(entries)
    }

    /// Full change history for a submission, most recent first, together
    /// with the current and original approver.
    pub async fn get_history(&self, submission_id: Uuid) -> OnboardingResult<SubmissionHistory> {
        let submission = sqlx::query(
            r#"SELECT approved_by, original_approved_by
               FROM submissions
               WHERE id = $1"#,
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OnboardingError::NotFound { id: submission_id })?;

        let rows = sqlx::query(
            r#"SELECT id, submission_id, field, old_value, new_value, reason, actor_id, created_at
               FROM audit_entries
               WHERE submission_id = $1
               ORDER BY created_at DESC, id"#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(|r| AuditEntry {
                id: r.get("id"),
                submission_id: r.get("submission_id"),
                field: r.get("field"),
                old_value: r.get("old_value"),
                new_value: r.get("new_value"),
                reason: r.get("reason"),
                actor_id: r.get("actor_id"),
                created_at: r.get("created_at"),
            })
            .collect();

        Ok(SubmissionHistory {
            current_approver: submission.get("approved_by"),
            original_approver: submission.get("original_approved_by"),
            entries,
        })
    }
}
