//! Error taxonomy for the account-opening core
//!
//! One enum covers every externally-visible failure. Create and edit always
//! roll back their transaction on any of these; batch apply catches them
//! per record instead.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for submission operations
#[derive(Error, Debug)]
pub enum OnboardingError {
    #[error("Validation failed: {details}")]
    Validation { details: String },

    #[error("Identity number {identity_number} already has an active submission")]
    DuplicateIdentity { identity_number: String },

    #[error("Submission {id} is in state {status}, operation requires {required}")]
    InvalidState {
        id: Uuid,
        status: String,
        required: String,
    },

    #[error("Access denied: {details}")]
    AccessDenied { details: String },

    #[error("Submission not found: {id}")]
    NotFound { id: Uuid },

    #[error("No effective changes in edit request")]
    NoChange,

    #[error("Record blocked by an active submission with the same identity number")]
    ConflictBlocked { existing: Uuid },

    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl OnboardingError {
    /// Stable machine-readable discriminant, independent of message wording.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::DuplicateIdentity { .. } => "duplicate_identity",
            Self::InvalidState { .. } => "invalid_state",
            Self::AccessDenied { .. } => "access_denied",
            Self::NotFound { .. } => "not_found",
            Self::NoChange => "no_change",
            Self::ConflictBlocked { .. } => "conflict_blocked",
            Self::Persistence(_) => "persistence_error",
        }
    }

    /// Message safe to return to callers. With `expose_internal` off,
    /// store errors collapse to their kind so driver detail never leaks.
    pub fn public_message(&self, expose_internal: bool) -> String {
        match self {
            Self::Persistence(_) if !expose_internal => "persistence_error".to_string(),
            other => other.to_string(),
        }
    }

    /// Map a sqlx failure, surfacing unique-constraint hits as duplicates.
    pub fn from_sqlx(err: sqlx::Error, identity_number: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::DuplicateIdentity {
                    identity_number: identity_number.to_string(),
                };
            }
        }
        Self::Persistence(err)
    }
}

/// Result type alias for submission operations
pub type OnboardingResult<T> = Result<T, OnboardingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable() {
        let err = OnboardingError::Validation {
            details: "name missing".into(),
        };
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(OnboardingError::NoChange.kind(), "no_change");
    }

    #[test]
    fn persistence_detail_suppressed_in_production() {
        let err = OnboardingError::Persistence(sqlx::Error::RowNotFound);
        assert_eq!(err.public_message(false), "persistence_error");
        assert!(err.public_message(true).contains("Database error"));
    }

    #[test]
    fn domain_errors_keep_their_message() {
        let err = OnboardingError::AccessDenied {
            details: "branch 2 cannot act on branch 5".into(),
        };
        assert!(err.public_message(false).contains("branch 5"));
    }
}
