//! Coarse activity log
//!
//! One row per completed operation, not per record. Batch apply and bulk
//! delete record their summary here; field-level detail belongs to the
//! audit trail instead.

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        actor_id: Uuid,
        action: &str,
        detail: serde_json::Value,
    ) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO activity_log (id, actor_id, action, detail, created_at)
               VALUES ($1, $2, $3, $4, now())"#,
        )
        .bind(id)
        .bind(actor_id)
        .bind(action)
        .bind(detail)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// Best-effort variant for callers whose primary result already
    /// committed; a lost log row is logged, never surfaced.
    pub async fn record_best_effort(&self, actor_id: Uuid, action: &str, detail: serde_json::Value) {
        if let Err(e) = self.record(actor_id, action, detail).await {
            warn!("Failed to record activity log entry for {}: {}", action, e);
        }
    }
}
