//! Submission root entity and aggregate view
//!
//! The submission row is owned exclusively by the writer; status transitions
//! go through `SubmissionWriter::set_status`, never through direct updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profiles::{
    AccountConfig, BeneficialOwner, EmergencyContact, EmploymentProfile, OtherBankHolding,
    OtherOccupation, PersonalProfile,
};

/// Submission status matching the DB constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the DB representation. Unknown values are a data bug; callers
    /// that read user-supplied strings should use `parse_lenient`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Case-insensitive parse for externally-supplied batch records.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        Self::parse(value.trim().to_lowercase().as_str())
    }

    /// Active submissions block a new one with the same identity number.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Root of the submission aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub branch_id: i64,
    pub reference_code: String,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,

    // Approval / rejection metadata, mutually exclusive
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,

    // Frozen at the first post-approval edit so the original approver
    // survives later re-approvals
    pub original_approved_by: Option<Uuid>,
    pub original_approved_at: Option<DateTime<Utc>>,

    pub edit_count: i32,
    pub last_edited_by: Option<Uuid>,
    pub last_edited_at: Option<DateTime<Utc>>,
}

/// Submission with all child records loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionAggregate {
    pub submission: Submission,
    pub personal: PersonalProfile,
    pub employment: EmploymentProfile,
    pub account: AccountConfig,
    pub emergency_contact: Option<EmergencyContact>,
    pub beneficial_owner: Option<BeneficialOwner>,
    pub other_bank_holdings: Vec<OtherBankHolding>,
    pub other_occupations: Vec<OtherOccupation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
        ] {
            assert_eq!(SubmissionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubmissionStatus::parse("archived"), None);
    }

    #[test]
    fn lenient_parse_accepts_batch_casing() {
        assert_eq!(
            SubmissionStatus::parse_lenient(" Approved "),
            Some(SubmissionStatus::Approved)
        );
        assert_eq!(SubmissionStatus::parse_lenient("REJECTED"), Some(SubmissionStatus::Rejected));
        assert_eq!(SubmissionStatus::parse_lenient("unknown"), None);
    }

    #[test]
    fn pending_and_approved_are_active() {
        assert!(SubmissionStatus::Pending.is_active());
        assert!(SubmissionStatus::Approved.is_active());
        assert!(!SubmissionStatus::Rejected.is_active());
    }
}
