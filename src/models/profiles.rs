//! Child records composing a submission
//!
//! PersonalProfile, EmploymentProfile and AccountConfig are mandatory 1:1
//! rows. EmergencyContact and BeneficialOwner are optional 0:1 rows. The two
//! collections are replace-only: edits delete and re-insert the whole set.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// New customer vs. existing customer with a legacy account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    #[default]
    New,
    Existing,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Existing => "existing",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "new" => Some(Self::New),
            "existing" => Some(Self::Existing),
            _ => None,
        }
    }
}

impl std::fmt::Display for CustomerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity fields, 1:1 with the submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalProfile {
    pub submission_id: Uuid,
    pub full_name: String,
    pub alias: Option<String>,
    pub identity_type: Option<String>,
    pub identity_number: String,
    pub identity_valid_until: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub birth_date: NaiveDate,
    pub address: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub email: String,
    pub phone: String,
    pub citizenship: Option<String>,
    pub marital_status: Option<String>,
    pub religion: Option<String>,
    pub education: Option<String>,
    pub mother_name: Option<String>,
    pub tax_id: Option<String>,
    pub account_for_self: bool,
    pub customer_type: CustomerType,
    pub legacy_account_number: Option<String>,
}

/// Occupation and income fields, 1:1 with the submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmploymentProfile {
    pub submission_id: Uuid,
    pub occupation: Option<String>,
    pub employer_name: Option<String>,
    pub employer_address: Option<String>,
    pub employer_phone: Option<String>,
    pub position: Option<String>,
    pub business_field: Option<String>,
    pub income_bracket: Option<String>,
    pub fund_source: Option<String>,
    pub monthly_transaction_volume: Option<Decimal>,
}

/// Product selection, 1:1 with the submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub submission_id: Uuid,
    pub product_type: Option<String>,
    pub card_type: Option<String>,
    pub has_card: bool,
    pub opening_deposit: Option<Decimal>,
    pub account_purpose: Option<String>,
}

/// Optional emergency contact. All-or-nothing population is enforced by the
/// calling layer, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub submission_id: Uuid,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

/// True beneficiary of an account opened on behalf of someone else.
/// Must not exist while `account_for_self` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeneficialOwner {
    pub submission_id: Uuid,
    pub full_name: String,
    pub identity_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub occupation: Option<String>,
    pub relationship: Option<String>,
}

/// Account held at another bank, 0:N
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherBankHolding {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub bank_name: String,
    pub account_type: String,
    pub account_number: String,
}

/// Secondary occupation / income source, 0:N
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherOccupation {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_type_parse() {
        assert_eq!(CustomerType::parse("Existing"), Some(CustomerType::Existing));
        assert_eq!(CustomerType::parse("new"), Some(CustomerType::New));
        assert_eq!(CustomerType::parse("corporate"), None);
    }
}
