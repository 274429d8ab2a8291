//! Ephemeral batch-progress ledger
//!
//! TTL-bound key-value snapshots addressed by a caller-supplied progress
//! key. The ledger is process-local; a horizontally-scaled deployment must
//! swap in a shared cache behind the same `set`/`get` surface. Entries
//! self-expire a short grace period after the batch finishes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Latest progress for one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// 0-100
    pub progress: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// Returned for unknown or expired keys.
    pub fn not_found() -> Self {
        Self {
            progress: 0,
            message: "session not found".to_string(),
            timestamp: Utc::now(),
        }
    }
}

struct Entry {
    snapshot: ProgressSnapshot,
    expires_at: DateTime<Utc>,
}

/// Process-local TTL ledger
#[derive(Clone)]
pub struct ProgressLedger {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    default_ttl: Duration,
}

impl Default for ProgressLedger {
    fn default() -> Self {
        // Long enough to outlive any realistic batch
        Self::new(Duration::minutes(30))
    }
}

impl ProgressLedger {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Publish the latest snapshot under `key` with the default TTL.
    pub async fn set(&self, key: &str, progress: u8, message: impl Into<String>) {
        self.set_with_ttl(key, progress, message, self.default_ttl)
            .await;
    }

    /// Publish with an explicit TTL. Completion/failure messages use a short
    /// grace TTL so finished sessions disappear on their own.
    pub async fn set_with_ttl(
        &self,
        key: &str,
        progress: u8,
        message: impl Into<String>,
        ttl: Duration,
    ) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                snapshot: ProgressSnapshot {
                    progress: progress.min(100),
                    message: message.into(),
                    timestamp: now,
                },
                expires_at: now + ttl,
            },
        );
    }

    /// Latest snapshot for `key`, or the not-found default.
    pub async fn get(&self, key: &str) -> ProgressSnapshot {
        let now = Utc::now();
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => entry.snapshot.clone(),
            _ => ProgressSnapshot::not_found(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let ledger = ProgressLedger::default();
        ledger.set("import-1", 40, "processing record 2 of 5").await;

        let snapshot = ledger.get("import-1").await;
        assert_eq!(snapshot.progress, 40);
        assert_eq!(snapshot.message, "processing record 2 of 5");
    }

    #[tokio::test]
    async fn unknown_key_returns_default() {
        let ledger = ProgressLedger::default();
        let snapshot = ledger.get("nope").await;
        assert_eq!(snapshot.progress, 0);
        assert_eq!(snapshot.message, "session not found");
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let ledger = ProgressLedger::default();
        ledger
            .set_with_ttl("import-2", 100, "done", Duration::milliseconds(20))
            .await;
        assert_eq!(ledger.get("import-2").await.progress, 100);

        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        assert_eq!(ledger.get("import-2").await.message, "session not found");
    }

    #[tokio::test]
    async fn progress_is_clamped_to_100() {
        let ledger = ProgressLedger::default();
        ledger.set("import-3", 250, "overflow").await;
        assert_eq!(ledger.get("import-3").await.progress, 100);
    }
}
