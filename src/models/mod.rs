//! Entity models for the submission aggregate

pub mod audit;
pub mod profiles;
pub mod submission;

pub use audit::{AuditEntry, SubmissionHistory};
pub use profiles::{
    AccountConfig, BeneficialOwner, CustomerType, EmergencyContact, EmploymentProfile,
    OtherBankHolding, OtherOccupation, PersonalProfile,
};
pub use submission::{Submission, SubmissionAggregate, SubmissionStatus};
