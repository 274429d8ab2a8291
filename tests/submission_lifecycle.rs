//! Database integration tests for the submission lifecycle
//!
//! These tests need a live Postgres (TEST_DATABASE_URL or DATABASE_URL) and
//! run only with the `database-tests` feature enabled:
//!
//!     cargo test --features database-tests

#[cfg(feature = "database-tests")]
mod db_tests {
    use anyhow::Result;
    use serde_json::{json, Value};
    use sqlx::PgPool;
    use uuid::Uuid;

    use account_opening::access::Actor;
    use account_opening::import::ImportOrchestrator;
    use account_opening::models::SubmissionStatus;
    use account_opening::normalize::normalize_record;
    use account_opening::{AuditRepository, SubmissionRepository, SubmissionWriter};

    // =========================================================================
    // TEST INFRASTRUCTURE
    // =========================================================================

    struct TestDb {
        pool: PgPool,
        created: Vec<Uuid>,
    }

    impl TestDb {
        async fn new() -> Result<Self> {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();

            let url = std::env::var("TEST_DATABASE_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .unwrap_or_else(|_| "postgresql:///account_opening".into());

            let pool = PgPool::connect(&url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Ok(Self {
                pool,
                created: Vec::new(),
            })
        }

        fn writer(&self) -> SubmissionWriter {
            SubmissionWriter::new(self.pool.clone())
        }

        fn repository(&self) -> SubmissionRepository {
            SubmissionRepository::new(self.pool.clone())
        }

        fn track(&mut self, id: Uuid) {
            self.created.push(id);
        }

        async fn cleanup(&self) -> Result<()> {
            if self.created.is_empty() {
                return Ok(());
            }
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
                sqlx::query(&sql)
                    .bind(&self.created)
                    .execute(&self.pool)
                    .await?;
            }
            sqlx::query("DELETE FROM submissions WHERE id = ANY($1)")
                .bind(&self.created)
                .execute(&self.pool)
                .await?;
            Ok(())
        }
    }

    fn unique_identity() -> String {
        format!("{:016}", Uuid::new_v4().as_u128() % 10_000_000_000_000_000)
    }

    fn base_record(identity: &str, branch: i64) -> Value {
        json!({
            "nama": "Ani Setyawati",
            "nik": identity,
            "email": "ani@example.com",
            "no_hp": "081234567890",
            "tanggal_lahir": "2000-01-01",
            "branch_id": branch,
        })
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    #[tokio::test]
    async fn create_builds_full_aggregate() -> Result<()> {
        let mut db = TestDb::new().await?;
        let writer = db.writer();
        let actor = Actor::staff(Uuid::new_v4(), 1);

        let identity = unique_identity();
        let input = normalize_record(&base_record(&identity, 1));
        let outcome = writer.create(&input, &actor).await?;
        db.track(outcome.id);

        // REG-<epoch-millis>-<0..999>
        let parts: Vec<&str> = outcome.reference_code.split('-').collect();
        assert_eq!(parts[0], "REG");
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(parts[2].parse::<u16>().unwrap() < 1000);

        let aggregate = db.repository().require_aggregate(outcome.id).await?;
        assert_eq!(aggregate.submission.status, SubmissionStatus::Pending);
        assert_eq!(aggregate.personal.identity_number, identity);
        assert!(aggregate.personal.account_for_self);
        assert!(aggregate.beneficial_owner.is_none());

        db.cleanup().await
    }

    #[tokio::test]
    async fn duplicate_identity_blocks_second_create() -> Result<()> {
        let mut db = TestDb::new().await?;
        let writer = db.writer();
        let actor = Actor::staff(Uuid::new_v4(), 1);

        let identity = unique_identity();
        let input = normalize_record(&base_record(&identity, 1));
        let first = writer.create(&input, &actor).await?;
        db.track(first.id);

        // Same identity from a different branch is still blocked
        let second = normalize_record(&base_record(&identity, 9));
        let err = writer.create(&second, &actor).await.unwrap_err();
        assert_eq!(err.kind(), "duplicate_identity");

        db.cleanup().await
    }

    #[tokio::test]
    async fn create_requires_mandatory_fields() -> Result<()> {
        let db = TestDb::new().await?;
        let writer = db.writer();
        let actor = Actor::staff(Uuid::new_v4(), 1);

        let input = normalize_record(&json!({ "nama": "Budi" }));
        let err = writer.create(&input, &actor).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        Ok(())
    }

    // =========================================================================
    // EDIT
    // =========================================================================

    #[tokio::test]
    async fn edit_rejected_unless_approved() -> Result<()> {
        let mut db = TestDb::new().await?;
        let writer = db.writer();
        let actor = Actor::branch_admin(Uuid::new_v4(), 1);

        let input = normalize_record(&base_record(&unique_identity(), 1));
        let outcome = writer.create(&input, &actor).await?;
        db.track(outcome.id);

        let mut field_set = serde_json::Map::new();
        field_set.insert("alias".into(), json!("Ani"));
        let err = writer
            .edit(outcome.id, &field_set, &actor, "test")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_state");

        // No audit rows may exist after a refused edit
        let history = AuditRepository::new(db.pool.clone())
            .get_history(outcome.id)
            .await?;
        assert!(history.entries.is_empty());

        db.cleanup().await
    }

    #[tokio::test]
    async fn cross_branch_edit_is_denied() -> Result<()> {
        let mut db = TestDb::new().await?;
        let writer = db.writer();
        let owner = Actor::branch_admin(Uuid::new_v4(), 5);

        let input = normalize_record(&base_record(&unique_identity(), 5));
        let outcome = writer.create(&input, &owner).await?;
        db.track(outcome.id);
        writer
            .set_status(outcome.id, SubmissionStatus::Approved, &owner)
            .await?;

        let outsider = Actor::branch_admin(Uuid::new_v4(), 2);
        let mut field_set = serde_json::Map::new();
        field_set.insert("alias".into(), json!("Ani"));
        let err = writer
            .edit(outcome.id, &field_set, &outsider, "test")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "access_denied");

        db.cleanup().await
    }

    #[tokio::test]
    async fn edit_diffs_audits_and_freezes_original_approver() -> Result<()> {
        let mut db = TestDb::new().await?;
        let writer = db.writer();
        let approver = Actor::branch_admin(Uuid::new_v4(), 1);

        let input = normalize_record(&base_record(&unique_identity(), 1));
        let outcome = writer.create(&input, &approver).await?;
        db.track(outcome.id);
        writer
            .set_status(outcome.id, SubmissionStatus::Approved, &approver)
            .await?;

        let mut field_set = serde_json::Map::new();
        field_set.insert("alias".into(), json!("Ani"));
        field_set.insert("opening_deposit".into(), json!("Rp 1.000.000"));
        // Unchanged field must not produce an audit row
        field_set.insert("email".into(), json!("ani@example.com"));

        let edit = writer
            .edit(outcome.id, &field_set, &approver, "correction after review")
            .await?;
        assert_eq!(edit.changed_field_count, 2);
        assert_eq!(edit.audit_entries.len(), 2);

        let submission = db
            .repository()
            .require_aggregate(outcome.id)
            .await?
            .submission;
        assert_eq!(submission.edit_count, 1);
        assert_eq!(submission.original_approved_by, Some(approver.id));

        // Re-submitting identical values is a no-op failure
        let err = writer
            .edit(outcome.id, &field_set, &approver, "same again")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "no_change");

        db.cleanup().await
    }

    #[tokio::test]
    async fn flipping_account_for_self_clears_beneficial_owner() -> Result<()> {
        let mut db = TestDb::new().await?;
        let writer = db.writer();
        let actor = Actor::branch_admin(Uuid::new_v4(), 1);

        let mut record = base_record(&unique_identity(), 1);
        record["account_for_self"] = json!(false);
        record["nama_bo"] = json!("Pak Haji");
        let outcome = writer.create(&normalize_record(&record), &actor).await?;
        db.track(outcome.id);
        writer
            .set_status(outcome.id, SubmissionStatus::Approved, &actor)
            .await?;

        let before = db.repository().require_aggregate(outcome.id).await?;
        assert!(before.beneficial_owner.is_some());

        let mut field_set = serde_json::Map::new();
        field_set.insert("account_for_self".into(), json!(true));
        let edit = writer
            .edit(outcome.id, &field_set, &actor, "ownership corrected")
            .await?;

        let after = db.repository().require_aggregate(outcome.id).await?;
        assert!(after.personal.account_for_self);
        assert!(after.beneficial_owner.is_none());

        // account_for_self change plus exactly one synthetic clearing entry
        let synthetic: Vec<_> = edit
            .audit_entries
            .iter()
            .filter(|e| e.field == "beneficial_owner")
            .collect();
        assert_eq!(synthetic.len(), 1);
        assert_eq!(synthetic[0].old_value.as_deref(), Some("Pak Haji"));
        assert_eq!(synthetic[0].new_value, None);

        db.cleanup().await
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    #[tokio::test]
    async fn history_is_most_recent_first() -> Result<()> {
        let mut db = TestDb::new().await?;
        let writer = db.writer();
        let actor = Actor::branch_admin(Uuid::new_v4(), 1);

        let input = normalize_record(&base_record(&unique_identity(), 1));
        let outcome = writer.create(&input, &actor).await?;
        db.track(outcome.id);
        writer
            .set_status(outcome.id, SubmissionStatus::Approved, &actor)
            .await?;

        for alias in ["First", "Second"] {
            let mut field_set = serde_json::Map::new();
            field_set.insert("alias".into(), json!(alias));
            writer.edit(outcome.id, &field_set, &actor, "rename").await?;
        }

        let history = AuditRepository::new(db.pool.clone())
            .get_history(outcome.id)
            .await?;
        assert_eq!(history.current_approver, Some(actor.id));
        assert_eq!(history.original_approver, Some(actor.id));
        assert_eq!(history.entries.len(), 2);
        assert_eq!(history.entries[0].new_value.as_deref(), Some("Second"));
        assert_eq!(history.entries[1].new_value.as_deref(), Some("First"));

        db.cleanup().await
    }

    // =========================================================================
    // BATCH IMPORT
    // =========================================================================

    #[tokio::test]
    async fn batch_apply_reports_per_record_outcomes() -> Result<()> {
        let mut db = TestDb::new().await?;
        let writer = db.writer();
        let admin = Actor::global_admin(Uuid::new_v4());

        // Existing pending submission: records with its identity are blocked
        let blocked_identity = unique_identity();
        let pending = writer
            .create(&normalize_record(&base_record(&blocked_identity, 1)), &admin)
            .await?;
        db.track(pending.id);

        // Existing rejected submission: replaceable under overwrite mode
        let replaceable_identity = unique_identity();
        let rejected = writer
            .create(
                &normalize_record(&base_record(&replaceable_identity, 1)),
                &admin,
            )
            .await?;
        db.track(rejected.id);
        writer
            .set_status(rejected.id, SubmissionStatus::Rejected, &admin)
            .await?;

        let fresh_identity = unique_identity();
        let records = vec![
            base_record(&fresh_identity, 1),
            base_record(&blocked_identity, 1),
            {
                let mut r = base_record(&replaceable_identity, 1);
                r["status"] = json!("approved");
                r
            },
        ];

        let orchestrator = ImportOrchestrator::new(db.pool.clone());
        let summary = orchestrator
            .apply(&records, &admin, true, "batch-test")
            .await?;

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.overwritten, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total, 3);

        let snapshot = orchestrator.get_progress("batch-test").await;
        assert_eq!(snapshot.progress, 100);

        // Overwrite touched only the root's status metadata
        let replaced = db.repository().require_aggregate(rejected.id).await?;
        assert_eq!(replaced.submission.status, SubmissionStatus::Approved);
        assert_eq!(replaced.personal.full_name, "Ani Setyawati");

        // Track the freshly imported row for cleanup
        if let Some((id, _)) = db
            .repository()
            .find_by_identity_number(&fresh_identity)
            .await?
            .first()
        {
            db.track(*id);
        }

        db.cleanup().await
    }

    #[tokio::test]
    async fn preview_warns_about_cross_branch_records() -> Result<()> {
        let db = TestDb::new().await?;
        let branch_admin = Actor::branch_admin(Uuid::new_v4(), 2);

        let records = vec![
            base_record(&unique_identity(), 2),
            base_record(&unique_identity(), 7),
        ];

        let orchestrator = ImportOrchestrator::new(db.pool.clone());
        let preview = orchestrator.preview(&records, &branch_admin).await?;

        assert_eq!(preview.total_records, 2);
        assert_eq!(preview.new_records, 2);
        assert_eq!(preview.cross_branch_warnings.len(), 1);
        assert!(preview.cross_branch_warnings[0].contains("branch 7"));
        Ok(())
    }

    // =========================================================================
    // BULK DELETE
    // =========================================================================

    #[tokio::test]
    async fn delete_by_status_cascades_children() -> Result<()> {
        let mut db = TestDb::new().await?;
        let writer = db.writer();
        let admin = Actor::global_admin(Uuid::new_v4());

        // Use a dedicated branch so the delete filter only hits this test's row
        let branch = 77_000 + (Uuid::new_v4().as_u128() % 1000) as i64;
        let outcome = writer
            .create(&normalize_record(&base_record(&unique_identity(), branch)), &admin)
            .await?;
        db.track(outcome.id);
        writer
            .set_status(outcome.id, SubmissionStatus::Rejected, &admin)
            .await?;

        let deleted = writer
            .delete_by_status(&[SubmissionStatus::Rejected], Some(branch), &admin)
            .await?;
        assert_eq!(deleted.deleted_count, 1);

        assert!(db.repository().get_submission(outcome.id).await?.is_none());
        let orphan: Option<(Uuid,)> =
            sqlx::query_as("SELECT submission_id FROM personal_profiles WHERE submission_id = $1")
                .bind(outcome.id)
                .fetch_optional(&db.pool)
                .await?;
        assert!(orphan.is_none());
        Ok(())
    }
}
