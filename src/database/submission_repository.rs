//! Submission read repository
//!
//! Query helpers over the aggregate: single-row lookups, full aggregate
//! loads, global identity-number lookups for duplicate detection, and the
//! filtered export feed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::access::{self, Action, Actor};
use crate::error::{OnboardingError, OnboardingResult};
use crate::models::{
    AccountConfig, BeneficialOwner, CustomerType, EmergencyContact, EmploymentProfile,
    OtherBankHolding, OtherOccupation, PersonalProfile, Submission, SubmissionAggregate,
    SubmissionStatus,
};

#[derive(Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the submission root row
    pub async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT id, branch_id, reference_code, status, created_at,
                      approved_by, approved_at, rejected_by, rejected_at,
                      original_approved_by, original_approved_at,
                      edit_count, last_edited_by, last_edited_at
               FROM submissions
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| map_submission(&r)))
    }

    /// Load the submission with all child records
    pub async fn get_aggregate(
        &self,
        id: Uuid,
    ) -> Result<Option<SubmissionAggregate>, sqlx::Error> {
        let Some(submission) = self.get_submission(id).await? else {
            return Ok(None);
        };

        let personal = self.get_personal(id).await?;
        let employment = self.get_employment(id).await?;
        let account = self.get_account(id).await?;

        // The three 1:1 rows are written in the same transaction as the
        // root; a missing one means the store is corrupt.
        let (Some(personal), Some(employment), Some(account)) = (personal, employment, account)
        else {
            return Err(sqlx::Error::RowNotFound);
        };

        Ok(Some(SubmissionAggregate {
            submission,
            personal,
            employment,
            account,
            emergency_contact: self.get_emergency_contact(id).await?,
            beneficial_owner: self.get_beneficial_owner(id).await?,
            other_bank_holdings: self.list_bank_holdings(id).await?,
            other_occupations: self.list_other_occupations(id).await?,
        }))
    }

    /// All submissions sharing an identity number, across every branch,
    /// newest first. Feeds the conflict classifier and the create-time
    /// duplicate check.
    pub async fn find_by_identity_number(
        &self,
        identity_number: &str,
    ) -> Result<Vec<(Uuid, SubmissionStatus)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT s.id, s.status
               FROM submissions s
               JOIN personal_profiles p ON p.submission_id = s.id
               WHERE p.identity_number = $1
               ORDER BY s.created_at DESC"#,
        )
        .bind(identity_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let status: String = r.get("status");
                (r.get("id"), parse_status(&status))
            })
            .collect())
    }

    /// Full aggregates filtered by creation date and branch, for export.
    /// Branch-scoped actors are pinned to their own branch regardless of the
    /// requested filter.
    pub async fn export_filtered(
        &self,
        actor: &Actor,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        branch_filter: Option<i64>,
    ) -> OnboardingResult<Vec<SubmissionAggregate>> {
        let effective_branch = if access::is_global(actor) {
            branch_filter
        } else {
            actor.branch_id
        };
        access::authorize(actor, Action::Export, effective_branch)?;

        let rows = sqlx::query(
            r#"SELECT id FROM submissions
               WHERE ($1::timestamptz IS NULL OR created_at >= $1)
                 AND ($2::timestamptz IS NULL OR created_at <= $2)
                 AND ($3::bigint IS NULL OR branch_id = $3)
               ORDER BY created_at DESC"#,
        )
        .bind(from)
        .bind(to)
        .bind(effective_branch)
        .fetch_all(&self.pool)
        .await?;

        let mut aggregates = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.get("id");
            if let Some(aggregate) = self.get_aggregate(id).await? {
                aggregates.push(aggregate);
            }
        }
        Ok(aggregates)
    }

    /// Resolve a submission or fail with NotFound.
    pub async fn require_aggregate(&self, id: Uuid) -> OnboardingResult<SubmissionAggregate> {
        self.get_aggregate(id)
            .await?
            .ok_or(OnboardingError::NotFound { id })
    }

    // ------------------------------------------------------------------------
    // Child loaders
    // ------------------------------------------------------------------------

    async fn get_personal(&self, id: Uuid) -> Result<Option<PersonalProfile>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT submission_id, full_name, alias, identity_type, identity_number,
                      identity_valid_until, birth_place, birth_date, address, village,
                      district, city, province, postal_code, email, phone, citizenship,
                      marital_status, religion, education, mother_name, tax_id,
                      account_for_self, customer_type, legacy_account_number
               FROM personal_profiles
               WHERE submission_id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let customer_type: String = r.get("customer_type");
            PersonalProfile {
                submission_id: r.get("submission_id"),
                full_name: r.get("full_name"),
                alias: r.get("alias"),
                identity_type: r.get("identity_type"),
                identity_number: r.get("identity_number"),
                identity_valid_until: r.get("identity_valid_until"),
                birth_place: r.get("birth_place"),
                birth_date: r.get("birth_date"),
                address: r.get("address"),
                village: r.get("village"),
                district: r.get("district"),
                city: r.get("city"),
                province: r.get("province"),
                postal_code: r.get("postal_code"),
                email: r.get("email"),
                phone: r.get("phone"),
                citizenship: r.get("citizenship"),
                marital_status: r.get("marital_status"),
                religion: r.get("religion"),
                education: r.get("education"),
                mother_name: r.get("mother_name"),
                tax_id: r.get("tax_id"),
                account_for_self: r.get("account_for_self"),
                customer_type: CustomerType::parse(&customer_type).unwrap_or_default(),
                legacy_account_number: r.get("legacy_account_number"),
            }
        }))
    }

    async fn get_employment(&self, id: Uuid) -> Result<Option<EmploymentProfile>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT submission_id, occupation, employer_name, employer_address,
                      employer_phone, position, business_field, income_bracket,
                      fund_source, monthly_transaction_volume
               FROM employment_profiles
               WHERE submission_id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| EmploymentProfile {
            submission_id: r.get("submission_id"),
            occupation: r.get("occupation"),
            employer_name: r.get("employer_name"),
            employer_address: r.get("employer_address"),
            employer_phone: r.get("employer_phone"),
            position: r.get("position"),
            business_field: r.get("business_field"),
            income_bracket: r.get("income_bracket"),
            fund_source: r.get::<Option<String>, _>("fund_source"),
            monthly_transaction_volume: r.get::<Option<Decimal>, _>("monthly_transaction_volume"),
        }))
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<AccountConfig>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT submission_id, product_type, card_type, has_card,
                      opening_deposit, account_purpose
               FROM account_configs
               WHERE submission_id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| AccountConfig {
            submission_id: r.get("submission_id"),
            product_type: r.get("product_type"),
            card_type: r.get("card_type"),
            has_card: r.get("has_card"),
            opening_deposit: r.get::<Option<Decimal>, _>("opening_deposit"),
            account_purpose: r.get("account_purpose"),
        }))
    }

    async fn get_emergency_contact(
        &self,
        id: Uuid,
    ) -> Result<Option<EmergencyContact>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT submission_id, name, address, phone, relationship
               FROM emergency_contacts
               WHERE submission_id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| EmergencyContact {
            submission_id: r.get("submission_id"),
            name: r.get("name"),
            address: r.get("address"),
            phone: r.get("phone"),
            relationship: r.get("relationship"),
        }))
    }

    async fn get_beneficial_owner(
        &self,
        id: Uuid,
    ) -> Result<Option<BeneficialOwner>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT submission_id, full_name, identity_number, address, phone,
                      occupation, relationship
               FROM beneficial_owners
               WHERE submission_id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| BeneficialOwner {
            submission_id: r.get("submission_id"),
            full_name: r.get("full_name"),
            identity_number: r.get("identity_number"),
            address: r.get("address"),
            phone: r.get("phone"),
            occupation: r.get("occupation"),
            relationship: r.get("relationship"),
        }))
    }

    async fn list_bank_holdings(&self, id: Uuid) -> Result<Vec<OtherBankHolding>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT id, submission_id, bank_name, account_type, account_number
               FROM other_bank_holdings
               WHERE submission_id = $1
               ORDER BY bank_name"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OtherBankHolding {
                id: r.get("id"),
                submission_id: r.get("submission_id"),
                bank_name: r.get("bank_name"),
                account_type: r.get("account_type"),
                account_number: r.get("account_number"),
            })
            .collect())
    }

    async fn list_other_occupations(
        &self,
        id: Uuid,
    ) -> Result<Vec<OtherOccupation>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT id, submission_id, description
               FROM other_occupations
               WHERE submission_id = $1
               ORDER BY description"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OtherOccupation {
                id: r.get("id"),
                submission_id: r.get("submission_id"),
                description: r.get("description"),
            })
            .collect())
    }
}

/// Map a submissions row. Status values outside the CHECK constraint cannot
/// occur; fall back to pending rather than panic if they somehow do.
pub(crate) fn map_submission(row: &PgRow) -> Submission {
    let status: String = row.get("status");
    Submission {
        id: row.get("id"),
        branch_id: row.get("branch_id"),
        reference_code: row.get("reference_code"),
        status: parse_status(&status),
        created_at: row.get("created_at"),
        approved_by: row.get("approved_by"),
        approved_at: row.get("approved_at"),
        rejected_by: row.get("rejected_by"),
        rejected_at: row.get("rejected_at"),
        original_approved_by: row.get("original_approved_by"),
        original_approved_at: row.get("original_approved_at"),
        edit_count: row.get("edit_count"),
        last_edited_by: row.get("last_edited_by"),
        last_edited_at: row.get("last_edited_at"),
    }
}

fn parse_status(value: &str) -> SubmissionStatus {
    SubmissionStatus::parse(value).unwrap_or_default()
}
