//! Batch reconciliation orchestrator
//!
//! Drives preview and apply passes over an already-deserialized array of
//! external records. Apply is deliberately best-effort: each record's
//! create/overwrite is its own transaction, one record's failure never
//! aborts its siblings, and there is no cancellation once started.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{self, Action, Actor};
use crate::database::{ActivityLogRepository, SubmissionWriter};
use crate::error::OnboardingResult;
use crate::import::classifier::{ConflictClassifier, ConflictKind};
use crate::import::{ActorDirectory, NullDirectory};
use crate::models::SubmissionStatus;
use crate::normalize::{self, NormalizedInput};
use crate::progress::{ProgressLedger, ProgressSnapshot};

const STATUS: &[&str] = &["status"];
const APPROVED_BY: &[&str] = &["disetujui_oleh", "approved_by"];
const APPROVED_AT: &[&str] = &["tanggal_disetujui", "approved_at"];
const REJECTED_BY: &[&str] = &["ditolak_oleh", "rejected_by"];
const REJECTED_AT: &[&str] = &["tanggal_ditolak", "rejected_at"];

/// Keep finished sessions readable briefly, then let them expire
const COMPLETION_GRACE_SECS: i64 = 60;

/// Result of a batch apply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub overwritten: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Result of a batch preview; no writes happen while computing it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPreview {
    pub total_records: usize,
    /// Declared status label -> count ("unspecified" when absent)
    pub status_breakdown: HashMap<String, usize>,
    /// Branch id -> count ("unspecified" when absent)
    pub branch_breakdown: HashMap<String, usize>,
    pub new_records: usize,
    pub replaceable_records: usize,
    pub blocked_records: usize,
    pub cross_branch_warnings: Vec<String>,
}

/// One external record, normalized plus import-only metadata
#[derive(Debug, Clone)]
struct ImportEnvelope {
    input: NormalizedInput,
    declared_status: Option<SubmissionStatus>,
    approved_by_name: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by_name: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
}

fn parse_envelope(raw: &Value) -> ImportEnvelope {
    ImportEnvelope {
        input: normalize::normalize_record(raw),
        declared_status: normalize::resolve_text(raw, STATUS)
            .and_then(|s| SubmissionStatus::parse_lenient(&s)),
        approved_by_name: normalize::resolve_text(raw, APPROVED_BY),
        approved_at: normalize::resolve_datetime(raw, APPROVED_AT),
        rejected_by_name: normalize::resolve_text(raw, REJECTED_BY),
        rejected_at: normalize::resolve_datetime(raw, REJECTED_AT),
    }
}

fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100) / total) as u8
}

pub struct ImportOrchestrator {
    writer: SubmissionWriter,
    classifier: ConflictClassifier,
    activity: ActivityLogRepository,
    ledger: ProgressLedger,
    directory: Arc<dyn ActorDirectory>,
}

impl ImportOrchestrator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            writer: SubmissionWriter::new(pool.clone()),
            classifier: ConflictClassifier::new(pool.clone()),
            activity: ActivityLogRepository::new(pool),
            ledger: ProgressLedger::default(),
            directory: Arc::new(NullDirectory),
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn ActorDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// The ledger this orchestrator publishes to, for sharing with readers.
    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// Latest progress snapshot for a batch, or the not-found default.
    pub async fn get_progress(&self, progress_key: &str) -> ProgressSnapshot {
        self.ledger.get(progress_key).await
    }

    // ========================================================================
    // Preview
    // ========================================================================

    /// Classify an entire batch without writing anything: aggregate counts
    /// plus cross-branch warnings for branch-scoped actors.
    pub async fn preview(
        &self,
        records: &[Value],
        actor: &Actor,
    ) -> OnboardingResult<ImportPreview> {
        access::authorize(actor, Action::Import, actor.branch_id)?;

        let mut preview = ImportPreview {
            total_records: records.len(),
            status_breakdown: HashMap::new(),
            branch_breakdown: HashMap::new(),
            new_records: 0,
            replaceable_records: 0,
            blocked_records: 0,
            cross_branch_warnings: Vec::new(),
        };

        for (index, raw) in records.iter().enumerate() {
            let envelope = parse_envelope(raw);

            let status_label = envelope
                .declared_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unspecified".to_string());
            *preview.status_breakdown.entry(status_label).or_insert(0) += 1;

            let branch_label = envelope
                .input
                .branch_id
                .map(|b| b.to_string())
                .unwrap_or_else(|| "unspecified".to_string());
            *preview.branch_breakdown.entry(branch_label).or_insert(0) += 1;

            if let Some(own) = actor.branch_id {
                if envelope.input.branch_id != Some(own) {
                    preview.cross_branch_warnings.push(format!(
                        "record {} belongs to branch {}, not your branch {}",
                        index + 1,
                        envelope
                            .input
                            .branch_id
                            .map(|b| b.to_string())
                            .unwrap_or_else(|| "unspecified".to_string()),
                        own
                    ));
                }
            }

            let verdict = match &envelope.input.personal.identity_number {
                Some(identity) => self.classifier.classify(identity).await?,
                None => ConflictKind::New,
            };
            match verdict {
                ConflictKind::New => preview.new_records += 1,
                ConflictKind::Replaceable { .. } => preview.replaceable_records += 1,
                ConflictKind::Blocked { .. } => preview.blocked_records += 1,
            }
        }

        Ok(preview)
    }

    // ========================================================================
    // Apply
    // ========================================================================

    /// Reconcile a batch against the store, record by record, publishing
    /// progress under `progress_key` after each one.
    pub async fn apply(
        &self,
        records: &[Value],
        actor: &Actor,
        overwrite_mode: bool,
        progress_key: &str,
    ) -> OnboardingResult<ImportSummary> {
        access::authorize(actor, Action::Import, actor.branch_id)?;

        let total = records.len();
        let mut summary = ImportSummary {
            imported: 0,
            overwritten: 0,
            skipped: 0,
            total,
        };

        info!(
            "Applying import batch of {} record(s), overwrite={}",
            total, overwrite_mode
        );
        self.ledger
            .set(progress_key, 0, format!("starting import of {} records", total))
            .await;

        for (index, raw) in records.iter().enumerate() {
            let envelope = parse_envelope(raw);

            // 1. Branch scoping: branch-bound actors only touch their own
            let in_scope = match actor.branch_id {
                Some(own) => envelope.input.branch_id == Some(own),
                None => true,
            };

            if !in_scope {
                summary.skipped += 1;
            } else {
                self.apply_one(&envelope, actor, overwrite_mode, &mut summary)
                    .await;
            }

            self.ledger
                .set(
                    progress_key,
                    progress_percent(index + 1, total),
                    format!("processed {} of {} records", index + 1, total),
                )
                .await;
        }

        self.ledger
            .set_with_ttl(
                progress_key,
                100,
                format!(
                    "import complete: {} imported, {} overwritten, {} skipped",
                    summary.imported, summary.overwritten, summary.skipped
                ),
                Duration::seconds(COMPLETION_GRACE_SECS),
            )
            .await;

        // One summary entry for the whole batch, never one per record
        self.activity
            .record_best_effort(
                actor.id,
                "apply_import",
                json!({
                    "imported": summary.imported,
                    "overwritten": summary.overwritten,
                    "skipped": summary.skipped,
                    "total": summary.total,
                    "overwrite_mode": overwrite_mode,
                }),
            )
            .await;

        info!(
            "Import batch done: {} imported, {} overwritten, {} skipped of {}",
            summary.imported, summary.overwritten, summary.skipped, summary.total
        );

        Ok(summary)
    }

    /// Process one in-scope record. Failures are counted as skipped and
    /// never propagate: the batch has no overarching transaction.
    async fn apply_one(
        &self,
        envelope: &ImportEnvelope,
        actor: &Actor,
        overwrite_mode: bool,
        summary: &mut ImportSummary,
    ) {
        // 2. Classify against the whole store
        let verdict = match &envelope.input.personal.identity_number {
            Some(identity) => match self.classifier.classify(identity).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!("Classification failed, skipping record: {}", e);
                    summary.skipped += 1;
                    return;
                }
            },
            // Let create() report the missing identity as a validation skip
            None => ConflictKind::New,
        };

        match verdict {
            // 3. Active duplicate: never imported, whatever the mode
            ConflictKind::Blocked { existing } => {
                info!("Record blocked by active submission {}", existing);
                summary.skipped += 1;
            }
            // 4. Fresh identity: full create
            ConflictKind::New => match self.writer.create(&envelope.input, actor).await {
                Ok(outcome) => {
                    info!("Imported record as {}", outcome.reference_code);
                    summary.imported += 1;
                }
                Err(e) => {
                    warn!("Import create failed, skipping record: {}", e);
                    summary.skipped += 1;
                }
            },
            // 5./6. Rejected duplicate: replace status metadata only when
            // the caller opted into overwrite mode
            ConflictKind::Replaceable { existing } => {
                if !overwrite_mode {
                    summary.skipped += 1;
                    return;
                }
                match self.overwrite(existing, envelope, actor).await {
                    Ok(()) => summary.overwritten += 1,
                    Err(e) => {
                        warn!("Import overwrite failed, skipping record: {}", e);
                        summary.skipped += 1;
                    }
                }
            }
        }
    }

    /// Overwrite updates only the root's status and decision metadata; the
    /// named decision maker is resolved through the directory when present,
    /// falling back to the acting importer.
    async fn overwrite(
        &self,
        existing: Uuid,
        envelope: &ImportEnvelope,
        actor: &Actor,
    ) -> OnboardingResult<()> {
        let status = envelope.declared_status.unwrap_or_default();

        let (named, at) = match status {
            SubmissionStatus::Approved => {
                (envelope.approved_by_name.as_deref(), envelope.approved_at)
            }
            SubmissionStatus::Rejected => {
                (envelope.rejected_by_name.as_deref(), envelope.rejected_at)
            }
            SubmissionStatus::Pending => (None, None),
        };

        let decided_by = match named {
            Some(name) => self
                .directory
                .resolve_by_name(name)
                .await
                .unwrap_or(actor.id),
            None => actor.id,
        };

        self.writer
            .overwrite_status_metadata(existing, status, decided_by, at.unwrap_or_else(Utc::now))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_extracts_import_metadata() {
        let envelope = parse_envelope(&json!({
            "nama": "Ani Setyawati",
            "nik": "3271010101010001",
            "branch_id": 3,
            "status": "Approved",
            "disetujui_oleh": "Kepala Cabang",
            "tanggal_disetujui": "2025-06-01 10:00:00",
        }));

        assert_eq!(envelope.declared_status, Some(SubmissionStatus::Approved));
        assert_eq!(envelope.approved_by_name.as_deref(), Some("Kepala Cabang"));
        assert!(envelope.approved_at.is_some());
        assert_eq!(envelope.input.branch_id, Some(3));
        assert_eq!(
            envelope.input.personal.full_name.as_deref(),
            Some("Ani Setyawati")
        );
    }

    #[test]
    fn envelope_without_metadata_is_plain_input() {
        let envelope = parse_envelope(&json!({ "nama": "Budi" }));
        assert_eq!(envelope.declared_status, None);
        assert_eq!(envelope.approved_by_name, None);
        assert_eq!(envelope.rejected_at, None);
    }

    #[test]
    fn progress_percent_covers_edges() {
        assert_eq!(progress_percent(0, 0), 100);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(3, 3), 100);
    }
}
