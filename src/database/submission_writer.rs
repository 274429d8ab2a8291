//! Submission writer: transactional create, status change, post-approval
//! edit, and bulk delete
//!
//! The writer owns every mutation of the aggregate. Each public operation is
//! exactly one transaction: all child writes commit together or not at all.
//! Concurrent edits to the same submission rely on the store's transaction
//! isolation alone; the last committed write wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::json;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{self, Action, Actor};
use crate::database::activity_log::ActivityLogRepository;
use crate::database::audit_repository::{AuditDraft, AuditRepository};
use crate::database::submission_repository::{map_submission, SubmissionRepository};
use crate::error::{OnboardingError, OnboardingResult};
use crate::fields::{self, FieldValue, TargetEntity};
use crate::models::{AuditEntry, Submission, SubmissionAggregate, SubmissionStatus};
use crate::normalize::{self, BankHoldingInput, NormalizedInput, OccupationInput};
use crate::notify::{LoggingNotifier, NotificationPayload, Notifier, TemplateKind};

/// Result of a successful create
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub id: Uuid,
    pub reference_code: String,
}

/// Result of a successful edit
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub changed_field_count: usize,
    pub audit_entries: Vec<AuditEntry>,
}

/// Result of a bulk delete
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}

#[derive(Clone)]
pub struct SubmissionWriter {
    pool: PgPool,
    repository: SubmissionRepository,
    activity: ActivityLogRepository,
    notifier: Arc<dyn Notifier>,
}

impl SubmissionWriter {
    pub fn new(pool: PgPool) -> Self {
        Self::with_notifier(pool, Arc::new(LoggingNotifier))
    }

    pub fn with_notifier(pool: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository: SubmissionRepository::new(pool.clone()),
            activity: ActivityLogRepository::new(pool.clone()),
            pool,
            notifier,
        }
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Create a full submission aggregate in one transaction.
    ///
    /// The caller supplies already-normalized input; this is the public
    /// intake path, so no role policy applies here — branch scoping for
    /// batch imports happens in the orchestrator.
    pub async fn create(
        &self,
        input: &NormalizedInput,
        actor: &Actor,
    ) -> OnboardingResult<CreateOutcome> {
        // 1. Required fields after normalization
        let branch_id = validate_required(input)?;
        let identity_number = input
            .personal
            .identity_number
            .clone()
            .unwrap_or_default();

        // 2. Global duplicate check: any pending or approved submission with
        //    this identity number blocks the create, whatever its branch
        let existing = self
            .repository
            .find_by_identity_number(&identity_number)
            .await?;
        if existing.iter().any(|(_, status)| status.is_active()) {
            return Err(OnboardingError::DuplicateIdentity { identity_number });
        }

        let id = Uuid::new_v4();
        let reference_code = make_reference_code(Utc::now());

        info!(
            "Creating submission {} ({}) for branch {}",
            id, reference_code, branch_id
        );

        // 3. One transaction for the root and every child row
        let mut tx = self.pool.begin().await?;

        let result = self
            .insert_aggregate(&mut tx, id, branch_id, &reference_code, input, actor)
            .await;

        match result {
            Ok(()) => {
                tx.commit().await?;
                info!("Submission {} created", reference_code);
                Ok(CreateOutcome { id, reference_code })
            }
            Err(err) => {
                // Explicit rollback; dropping the tx would do it too, but the
                // failure path should read like one
                tx.rollback().await.ok();
                Err(OnboardingError::from_sqlx(err, &identity_number))
            }
        }
    }

    async fn insert_aggregate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        branch_id: i64,
        reference_code: &str,
        input: &NormalizedInput,
        _actor: &Actor,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO submissions (id, branch_id, reference_code, status, created_at)
               VALUES ($1, $2, $3, 'pending', now())"#,
        )
        .bind(id)
        .bind(branch_id)
        .bind(reference_code)
        .execute(&mut **tx)
        .await?;

        let p = &input.personal;
        sqlx::query(
            r#"INSERT INTO personal_profiles
                   (submission_id, full_name, alias, identity_type, identity_number,
                    identity_valid_until, birth_place, birth_date, address, village,
                    district, city, province, postal_code, email, phone, citizenship,
                    marital_status, religion, education, mother_name, tax_id,
                    account_for_self, customer_type, legacy_account_number)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                       $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)"#,
        )
        .bind(id)
        .bind(&p.full_name)
        .bind(&p.alias)
        .bind(&p.identity_type)
        .bind(&p.identity_number)
        .bind(p.identity_valid_until)
        .bind(&p.birth_place)
        .bind(p.birth_date)
        .bind(&p.address)
        .bind(&p.village)
        .bind(&p.district)
        .bind(&p.city)
        .bind(&p.province)
        .bind(&p.postal_code)
        .bind(&p.email)
        .bind(&p.phone)
        .bind(&p.citizenship)
        .bind(&p.marital_status)
        .bind(&p.religion)
        .bind(&p.education)
        .bind(&p.mother_name)
        .bind(&p.tax_id)
        .bind(p.account_for_self)
        .bind(p.customer_type.as_str())
        .bind(&p.legacy_account_number)
        .execute(&mut **tx)
        .await?;

        let e = &input.employment;
        sqlx::query(
            r#"INSERT INTO employment_profiles
                   (submission_id, occupation, employer_name, employer_address,
                    employer_phone, position, business_field, income_bracket,
                    fund_source, monthly_transaction_volume)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(id)
        .bind(&e.occupation)
        .bind(&e.employer_name)
        .bind(&e.employer_address)
        .bind(&e.employer_phone)
        .bind(&e.position)
        .bind(&e.business_field)
        .bind(&e.income_bracket)
        .bind(&e.fund_source)
        .bind(e.monthly_transaction_volume)
        .execute(&mut **tx)
        .await?;

        let a = &input.account;
        sqlx::query(
            r#"INSERT INTO account_configs
                   (submission_id, product_type, card_type, has_card,
                    opening_deposit, account_purpose)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(id)
        .bind(&a.product_type)
        .bind(&a.card_type)
        .bind(a.has_card)
        .bind(a.opening_deposit)
        .bind(&a.account_purpose)
        .execute(&mut **tx)
        .await?;

        if !input.emergency_contact.is_empty() {
            let c = &input.emergency_contact;
            sqlx::query(
                r#"INSERT INTO emergency_contacts
                       (submission_id, name, address, phone, relationship)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(id)
            .bind(&c.name)
            .bind(&c.address)
            .bind(&c.phone)
            .bind(&c.relationship)
            .execute(&mut **tx)
            .await?;
        }

        // BO exists only for accounts opened on someone else's behalf
        if !p.account_for_self {
            if let Some(bo_name) = &input.beneficial_owner.full_name {
                let b = &input.beneficial_owner;
                sqlx::query(
                    r#"INSERT INTO beneficial_owners
                           (submission_id, full_name, identity_number, address,
                            phone, occupation, relationship)
                       VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
                )
                .bind(id)
                .bind(bo_name)
                .bind(&b.identity_number)
                .bind(&b.address)
                .bind(&b.phone)
                .bind(&b.occupation)
                .bind(&b.relationship)
                .execute(&mut **tx)
                .await?;
            }
        }

        insert_bank_holdings(tx, id, &input.other_bank_holdings).await?;
        insert_other_occupations(tx, id, &input.other_occupations).await?;

        Ok(())
    }

    // ========================================================================
    // Status change
    // ========================================================================

    /// Move a submission between pending/approved/rejected. Setting one of
    /// the terminal decisions clears the opposite decision's metadata, and
    /// fires the notification trigger after commit.
    pub async fn set_status(
        &self,
        id: Uuid,
        new_status: SubmissionStatus,
        actor: &Actor,
    ) -> OnboardingResult<Submission> {
        let aggregate = self.repository.require_aggregate(id).await?;
        access::authorize(actor, Action::SetStatus, Some(aggregate.submission.branch_id))?;

        if aggregate.submission.status == new_status {
            return Err(OnboardingError::InvalidState {
                id,
                status: aggregate.submission.status.to_string(),
                required: format!("any status other than {}", new_status),
            });
        }

        let now = Utc::now();
        let (approved_by, approved_at, rejected_by, rejected_at) = match new_status {
            SubmissionStatus::Approved => (Some(actor.id), Some(now), None, None),
            SubmissionStatus::Rejected => (None, None, Some(actor.id), Some(now)),
            SubmissionStatus::Pending => (None, None, None, None),
        };

        let row = sqlx::query(
            r#"UPDATE submissions
               SET status = $2,
                   approved_by = $3, approved_at = $4,
                   rejected_by = $5, rejected_at = $6
               WHERE id = $1
               RETURNING id, branch_id, reference_code, status, created_at,
                         approved_by, approved_at, rejected_by, rejected_at,
                         original_approved_by, original_approved_at,
                         edit_count, last_edited_by, last_edited_at"#,
        )
        .bind(id)
        .bind(new_status.as_str())
        .bind(approved_by)
        .bind(approved_at)
        .bind(rejected_by)
        .bind(rejected_at)
        .fetch_one(&self.pool)
        .await?;

        let submission = map_submission(&row);
        info!(
            "Submission {} moved to {}",
            submission.reference_code, new_status
        );

        // Fire-and-forget: delivery failures never unwind a committed change
        if let Some(template) = TemplateKind::for_status(new_status) {
            let payload = NotificationPayload {
                reference_code: submission.reference_code.clone(),
                applicant_name: aggregate.personal.full_name.clone(),
                branch_id: submission.branch_id,
            };
            if let Err(e) = self
                .notifier
                .notify(&aggregate.personal.email, template, &payload)
                .await
            {
                warn!(
                    "Notification for {} failed: {}",
                    submission.reference_code, e
                );
            }
        }

        Ok(submission)
    }

    // ========================================================================
    // Post-approval edit
    // ========================================================================

    /// Apply a field set to an approved submission.
    ///
    /// Every incoming field resolves through the static edit table; values
    /// are normalized, diffed against the stored value, and only effective
    /// changes are written. One transaction covers the entity updates, the
    /// audit rows, and the edit-count bump.
    pub async fn edit(
        &self,
        id: Uuid,
        field_set: &serde_json::Map<String, serde_json::Value>,
        actor: &Actor,
        reason: &str,
    ) -> OnboardingResult<EditOutcome> {
        let aggregate = self.repository.require_aggregate(id).await?;

        // 1. Guards: only approved submissions are editable, only by global
        //    actors or actors scoped to the submission's branch
        if aggregate.submission.status != SubmissionStatus::Approved {
            return Err(OnboardingError::InvalidState {
                id,
                status: aggregate.submission.status.to_string(),
                required: "approved".to_string(),
            });
        }
        access::authorize(actor, Action::Edit, Some(aggregate.submission.branch_id))?;

        // 2. Diff pass over the declarative field table
        let mut staged: Vec<(TargetEntity, &'static str, FieldValue)> = Vec::new();
        let mut drafts: Vec<AuditDraft> = Vec::new();
        let mut new_holdings: Option<Vec<BankHoldingInput>> = None;
        let mut new_occupations: Option<Vec<OccupationInput>> = None;
        let mut account_for_self_requested = false;

        for (key, value) in field_set {
            if key == "other_bank_holdings" {
                let incoming = normalize::parse_bank_holdings(value);
                let old = holdings_canonical_rows(&aggregate);
                let new = holdings_canonical_inputs(&incoming);
                if old != new {
                    drafts.push(AuditDraft {
                        field: key.clone(),
                        old_value: Some(old),
                        new_value: Some(new),
                    });
                    new_holdings = Some(incoming);
                }
                continue;
            }
            if key == "other_occupations" {
                let incoming = normalize::parse_other_occupations(value);
                let old = occupations_canonical_rows(&aggregate);
                let new = occupations_canonical_inputs(&incoming);
                if old != new {
                    drafts.push(AuditDraft {
                        field: key.clone(),
                        old_value: Some(old),
                        new_value: Some(new),
                    });
                    new_occupations = Some(incoming);
                }
                continue;
            }

            let Some(spec) = fields::lookup(key) else {
                warn!("Ignoring unknown edit field '{}'", key);
                continue;
            };

            let staged_value = fields::normalize_value(spec.kind, value);
            if spec.field == "account_for_self" {
                account_for_self_requested = staged_value == FieldValue::Bool(true);
            }

            let new_canonical = staged_value.canonical();
            let current = (spec.current)(&aggregate);
            if new_canonical == current {
                continue;
            }

            drafts.push(AuditDraft {
                field: spec.field.to_string(),
                old_value: current,
                new_value: new_canonical,
            });
            staged.push((spec.entity, spec.column, staged_value));
        }

        let changed_field_count = drafts.len();

        // 3. Ownership flip: setting account_for_self true removes any BO
        //    row, with one synthetic audit entry recording the clearing.
        //    Queued BO-field changes stay in the audit trail but are not
        //    applied to the removed row.
        let clearing_bo =
            account_for_self_requested && aggregate.beneficial_owner.is_some();
        if clearing_bo {
            let bo_name = aggregate
                .beneficial_owner
                .as_ref()
                .map(|b| b.full_name.clone());
            drafts.push(AuditDraft {
                field: "beneficial_owner".to_string(),
                old_value: bo_name,
                new_value: None,
            });
        }

        if drafts.is_empty() {
            return Err(OnboardingError::NoChange);
        }

        info!(
            "Editing submission {}: {} field change(s)",
            aggregate.submission.reference_code, changed_field_count
        );

        // 4. Apply everything in one transaction
        let mut tx = self.pool.begin().await?;

        // First-ever edit freezes the original approver before anything else
        if aggregate.submission.edit_count == 0 {
            sqlx::query(
                r#"UPDATE submissions
                   SET original_approved_by = approved_by,
                       original_approved_at = approved_at
                   WHERE id = $1"#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        for entity in [
            TargetEntity::Personal,
            TargetEntity::Employment,
            TargetEntity::Account,
            TargetEntity::EmergencyContact,
            TargetEntity::BeneficialOwner,
        ] {
            // Any request for self-ownership suppresses BO writes entirely;
            // the row is deleted below and must not be re-created
            if entity == TargetEntity::BeneficialOwner && account_for_self_requested {
                continue;
            }
            let updates: Vec<(&'static str, FieldValue)> = staged
                .iter()
                .filter(|(e, _, _)| *e == entity)
                .map(|(_, column, value)| (*column, value.clone()))
                .collect();
            if updates.is_empty() {
                continue;
            }
            apply_entity_updates(&mut tx, entity, id, &updates).await?;
        }

        if account_for_self_requested {
            sqlx::query("DELETE FROM beneficial_owners WHERE submission_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(holdings) = &new_holdings {
            sqlx::query("DELETE FROM other_bank_holdings WHERE submission_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_bank_holdings(&mut tx, id, holdings).await?;
        }
        if let Some(occupations) = &new_occupations {
            sqlx::query("DELETE FROM other_occupations WHERE submission_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_other_occupations(&mut tx, id, occupations).await?;
        }

        let audit_entries =
            AuditRepository::insert_entries(&mut tx, id, &drafts, actor.id, Some(reason)).await?;

        sqlx::query(
            r#"UPDATE submissions
               SET edit_count = edit_count + 1,
                   last_edited_by = $2,
                   last_edited_at = now()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(actor.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(EditOutcome {
            changed_field_count,
            audit_entries,
        })
    }

    // ========================================================================
    // Import overwrite
    // ========================================================================

    /// Overwrite path for batch import: replace only the root submission's
    /// status and decision metadata of a rejected duplicate. Child entity
    /// data is deliberately left untouched.
    pub(crate) async fn overwrite_status_metadata(
        &self,
        id: Uuid,
        new_status: SubmissionStatus,
        decided_by: Uuid,
        decided_at: DateTime<Utc>,
    ) -> OnboardingResult<()> {
        let (approved_by, approved_at, rejected_by, rejected_at) = match new_status {
            SubmissionStatus::Approved => (Some(decided_by), Some(decided_at), None, None),
            SubmissionStatus::Rejected => (None, None, Some(decided_by), Some(decided_at)),
            SubmissionStatus::Pending => (None, None, None, None),
        };

        sqlx::query(
            r#"UPDATE submissions
               SET status = $2,
                   approved_by = $3, approved_at = $4,
                   rejected_by = $5, rejected_at = $6
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(new_status.as_str())
        .bind(approved_by)
        .bind(approved_at)
        .bind(rejected_by)
        .bind(rejected_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ========================================================================
    // Bulk delete
    // ========================================================================

    /// Hard-delete every submission matching the status filter (optionally
    /// scoped to one branch), cascading through child tables in dependency
    /// order inside a single transaction.
    pub async fn delete_by_status(
        &self,
        status_filter: &[SubmissionStatus],
        branch_filter: Option<i64>,
        actor: &Actor,
    ) -> OnboardingResult<DeleteOutcome> {
        access::authorize(actor, Action::Delete, branch_filter)?;

        if status_filter.is_empty() {
            return Err(OnboardingError::Validation {
                details: "status filter must name at least one status".to_string(),
            });
        }
        let statuses: Vec<String> = status_filter.iter().map(|s| s.to_string()).collect();

        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"SELECT id FROM submissions
               WHERE status = ANY($1)
                 AND ($2::bigint IS NULL OR branch_id = $2)"#,
        )
        .bind(&statuses)
        .bind(branch_filter)
        .fetch_all(&mut *tx)
        .await?;

        let ids: Vec<Uuid> = rows
            .into_iter()
            .map(|r| sqlx::Row::get(&r, "id"))
            .collect();

        if ids.is_empty() {
            tx.rollback().await.ok();
            return Ok(DeleteOutcome { deleted_count: 0 });
        }

        // Children first, root last
        for table in [
            "audit_entries",
            "other_bank_holdings",
            "other_occupations",
            "beneficial_owners",
            "emergency_contacts",
            "account_configs",
            "employment_profiles",
            "personal_profiles",
        ] {
            let sql = format!("DELETE FROM {} WHERE submission_id = ANY($1)", table);
            sqlx::query(&sql).bind(&ids).execute(&mut *tx).await?;
        }

        sqlx::query("DELETE FROM submissions WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let deleted_count = ids.len() as u64;
        info!(
            "Deleted {} submission(s) with status in {:?}",
            deleted_count, statuses
        );

        self.activity
            .record_best_effort(
                actor.id,
                "delete_by_status",
                json!({ "statuses": statuses, "branch": branch_filter, "deleted": deleted_count }),
            )
            .await;

        Ok(DeleteOutcome { deleted_count })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Check create preconditions; returns the branch id on success.
fn validate_required(input: &NormalizedInput) -> OnboardingResult<i64> {
    let mut missing = Vec::new();
    if input.personal.full_name.is_none() {
        missing.push("full_name");
    }
    if input.personal.identity_number.is_none() {
        missing.push("identity_number");
    }
    if input.personal.email.is_none() {
        missing.push("email");
    }
    if input.personal.phone.is_none() {
        missing.push("phone");
    }
    if input.personal.birth_date.is_none() {
        missing.push("birth_date");
    }
    if input.branch_id.is_none() {
        missing.push("branch_id");
    }

    match (missing.is_empty(), input.branch_id) {
        (true, Some(branch_id)) => Ok(branch_id),
        _ => Err(OnboardingError::Validation {
            details: format!("missing required field(s): {}", missing.join(", ")),
        }),
    }
}

/// Human-facing reference code: epoch millis plus a random suffix. Collisions
/// are accepted as negligible and not enforced against.
fn make_reference_code(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("REG-{}-{}", now.timestamp_millis(), suffix)
}

fn bind_field<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &FieldValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        FieldValue::Text(v) => query.bind(v.clone()),
        FieldValue::Currency(v) => query.bind(*v),
        FieldValue::Date(v) => query.bind(*v),
        FieldValue::Bool(v) => query.bind(*v),
    }
}

/// Apply staged column updates for one entity. 1:1 rows get a plain UPDATE;
/// 0:1 rows (emergency contact, BO) go through an upsert because the row may
/// not exist yet.
async fn apply_entity_updates(
    tx: &mut Transaction<'_, Postgres>,
    entity: TargetEntity,
    submission_id: Uuid,
    updates: &[(&'static str, FieldValue)],
) -> Result<(), sqlx::Error> {
    let columns: Vec<&str> = updates.iter().map(|(c, _)| *c).collect();
    let sql = if entity.is_optional_row() {
        build_upsert(entity.table(), &columns)
    } else {
        build_update(entity.table(), &columns)
    };

    let mut query = sqlx::query(&sql).bind(submission_id);
    for (_, value) in updates {
        query = bind_field(query, value);
    }
    query.execute(&mut **tx).await?;
    Ok(())
}

/// `UPDATE t SET c1 = $2, c2 = $3 WHERE submission_id = $1`
fn build_update(table: &str, columns: &[&str]) -> String {
    let sets = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", c, i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    format!("UPDATE {} SET {} WHERE submission_id = $1", table, sets)
}

/// `INSERT ... ON CONFLICT (submission_id) DO UPDATE SET c = EXCLUDED.c`
fn build_upsert(table: &str, columns: &[&str]) -> String {
    let cols = columns.join(", ");
    let placeholders = (0..columns.len())
        .map(|i| format!("${}", i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    let sets = columns
        .iter()
        .map(|c| format!("{} = EXCLUDED.{}", c, c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} (submission_id, {}) VALUES ($1, {}) ON CONFLICT (submission_id) DO UPDATE SET {}",
        table, cols, placeholders, sets
    )
}

async fn insert_bank_holdings(
    tx: &mut Transaction<'_, Postgres>,
    submission_id: Uuid,
    holdings: &[BankHoldingInput],
) -> Result<(), sqlx::Error> {
    for holding in holdings {
        sqlx::query(
            r#"INSERT INTO other_bank_holdings
                   (id, submission_id, bank_name, account_type, account_number)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(Uuid::new_v4())
        .bind(submission_id)
        .bind(&holding.bank_name)
        .bind(&holding.account_type)
        .bind(&holding.account_number)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_other_occupations(
    tx: &mut Transaction<'_, Postgres>,
    submission_id: Uuid,
    occupations: &[OccupationInput],
) -> Result<(), sqlx::Error> {
    for occupation in occupations {
        sqlx::query(
            r#"INSERT INTO other_occupations (id, submission_id, description)
               VALUES ($1, $2, $3)"#,
        )
        .bind(Uuid::new_v4())
        .bind(submission_id)
        .bind(&occupation.description)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

// Canonical serializations for replace-only collections, used for change
// detection and audit values

fn holdings_canonical_rows(aggregate: &SubmissionAggregate) -> String {
    let items: Vec<serde_json::Value> = aggregate
        .other_bank_holdings
        .iter()
        .map(|h| {
            json!({
                "bank_name": h.bank_name,
                "account_type": h.account_type,
                "account_number": h.account_number,
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

fn holdings_canonical_inputs(holdings: &[BankHoldingInput]) -> String {
    let items: Vec<serde_json::Value> = holdings
        .iter()
        .map(|h| {
            json!({
                "bank_name": h.bank_name,
                "account_type": h.account_type,
                "account_number": h.account_number,
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

fn occupations_canonical_rows(aggregate: &SubmissionAggregate) -> String {
    let items: Vec<serde_json::Value> = aggregate
        .other_occupations
        .iter()
        .map(|o| json!({ "description": o.description }))
        .collect();
    serde_json::Value::Array(items).to_string()
}

fn occupations_canonical_inputs(occupations: &[OccupationInput]) -> String {
    let items: Vec<serde_json::Value> = occupations
        .iter()
        .map(|o| json!({ "description": o.description }))
        .collect();
    serde_json::Value::Array(items).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_code_shape() {
        let code = make_reference_code(Utc::now());
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "REG");
        assert!(parts[1].parse::<i64>().is_ok());
        let suffix: u16 = parts[2].parse().unwrap();
        assert!(suffix < 1000);
    }

    #[test]
    fn update_sql_binds_columns_after_the_id() {
        assert_eq!(
            build_update("account_configs", &["card_type", "has_card"]),
            "UPDATE account_configs SET card_type = $2, has_card = $3 WHERE submission_id = $1"
        );
    }

    #[test]
    fn upsert_sql_targets_the_submission_key() {
        let sql = build_upsert("beneficial_owners", &["address"]);
        assert!(sql.starts_with("INSERT INTO beneficial_owners (submission_id, address)"));
        assert!(sql.contains("ON CONFLICT (submission_id) DO UPDATE SET address = EXCLUDED.address"));
    }

    #[test]
    fn missing_required_fields_are_listed() {
        let input = NormalizedInput::default();
        let err = validate_required(&input).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("full_name"));
        assert!(message.contains("identity_number"));
        assert!(message.contains("branch_id"));
    }
}
