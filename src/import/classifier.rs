//! Conflict classifier for externally-supplied records
//!
//! Classification is keyed by identity number and looked up globally: a
//! pending or approved submission in any branch blocks an import, a rejected
//! one may be replaced when the caller opts into overwrite mode.

use sqlx::PgPool;
use uuid::Uuid;

use crate::database::SubmissionRepository;
use crate::models::SubmissionStatus;

/// What is legal for one external record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// No existing submission shares the identity number
    New,
    /// A rejected submission exists; overwrite mode may replace its status
    Replaceable { existing: Uuid },
    /// An active submission exists; the record cannot be imported
    Blocked { existing: Uuid },
}

impl ConflictKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Replaceable { .. } => "replaceable",
            Self::Blocked { .. } => "blocked",
        }
    }
}

/// Decide the conflict kind from every submission sharing the identity
/// number. An active one anywhere wins over any number of rejected ones.
pub fn classify_existing(existing: &[(Uuid, SubmissionStatus)]) -> ConflictKind {
    if let Some((id, _)) = existing.iter().find(|(_, status)| status.is_active()) {
        return ConflictKind::Blocked { existing: *id };
    }
    if let Some((id, _)) = existing
        .iter()
        .find(|(_, status)| *status == SubmissionStatus::Rejected)
    {
        return ConflictKind::Replaceable { existing: *id };
    }
    ConflictKind::New
}

#[derive(Clone)]
pub struct ConflictClassifier {
    repository: SubmissionRepository,
}

impl ConflictClassifier {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: SubmissionRepository::new(pool),
        }
    }

    /// Classify one identity number against the whole store.
    pub async fn classify(&self, identity_number: &str) -> Result<ConflictKind, sqlx::Error> {
        let existing = self
            .repository
            .find_by_identity_number(identity_number)
            .await?;
        Ok(classify_existing(&existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: SubmissionStatus) -> (Uuid, SubmissionStatus) {
        (Uuid::new_v4(), status)
    }

    #[test]
    fn no_match_is_new() {
        assert_eq!(classify_existing(&[]), ConflictKind::New);
    }

    #[test]
    fn pending_or_approved_blocks_regardless_of_order() {
        let pending = entry(SubmissionStatus::Pending);
        assert_eq!(
            classify_existing(&[pending]),
            ConflictKind::Blocked { existing: pending.0 }
        );

        let approved = entry(SubmissionStatus::Approved);
        let rejected = entry(SubmissionStatus::Rejected);
        assert_eq!(
            classify_existing(&[rejected, approved]),
            ConflictKind::Blocked { existing: approved.0 }
        );
    }

    #[test]
    fn rejected_only_is_replaceable() {
        let rejected = entry(SubmissionStatus::Rejected);
        assert_eq!(
            classify_existing(&[rejected]),
            ConflictKind::Replaceable { existing: rejected.0 }
        );
    }
}
