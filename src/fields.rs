//! Declarative field table for post-approval edits
//!
//! Every editable field maps to `{target entity, column, normalizer}`. The
//! writer's edit path walks this table with one generic diff-and-apply
//! routine; adding an editable field means adding one row here, not another
//! branch in the writer.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::SubmissionAggregate;
use crate::normalize;

/// Entity a field's column lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEntity {
    Personal,
    Employment,
    Account,
    EmergencyContact,
    BeneficialOwner,
}

impl TargetEntity {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Personal => "personal_profiles",
            Self::Employment => "employment_profiles",
            Self::Account => "account_configs",
            Self::EmergencyContact => "emergency_contacts",
            Self::BeneficialOwner => "beneficial_owners",
        }
    }

    /// 0:1 entities whose row may not exist yet; updates go through upsert.
    pub fn is_optional_row(&self) -> bool {
        matches!(self, Self::EmergencyContact | Self::BeneficialOwner)
    }
}

/// Normalization applied to an incoming edit value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Currency,
    Date,
    Bool,
}

/// A normalized value staged for one column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Currency(Option<Decimal>),
    Date(Option<NaiveDate>),
    Bool(bool),
}

impl FieldValue {
    /// Canonical string used for change detection and audit rows.
    pub fn canonical(&self) -> Option<String> {
        match self {
            Self::Text(v) => v.clone(),
            Self::Currency(v) => v.map(canonical_decimal),
            Self::Date(v) => v.map(|d| d.to_string()),
            Self::Bool(v) => Some(v.to_string()),
        }
    }
}

pub fn canonical_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

/// One row of the edit table
pub struct FieldSpec {
    /// Canonical public field name accepted in edit requests
    pub field: &'static str,
    pub entity: TargetEntity,
    pub column: &'static str,
    pub kind: FieldKind,
    /// Canonical string of the currently stored value
    pub current: fn(&SubmissionAggregate) -> Option<String>,
}

/// Normalize one incoming value according to the field's kind.
pub fn normalize_value(kind: FieldKind, value: &Value) -> FieldValue {
    match kind {
        FieldKind::Text => FieldValue::Text(match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }),
        FieldKind::Currency => FieldValue::Currency(match value {
            Value::String(s) => normalize::parse_currency(s),
            Value::Number(n) => normalize::parse_currency(&n.to_string()),
            _ => None,
        }),
        FieldKind::Date => FieldValue::Date(match value {
            Value::String(s) => normalize::parse_date(s),
            _ => None,
        }),
        FieldKind::Bool => FieldValue::Bool(normalize::parse_bool(value)),
    }
}

/// Find the spec for a public field name.
pub fn lookup(field: &str) -> Option<&'static FieldSpec> {
    EDIT_FIELDS.iter().find(|spec| spec.field == field)
}

/// The complete edit table.
pub const EDIT_FIELDS: &[FieldSpec] = &[
    // -- personal_profiles ---------------------------------------------------
    FieldSpec {
        field: "full_name",
        entity: TargetEntity::Personal,
        column: "full_name",
        kind: FieldKind::Text,
        current: |a| Some(a.personal.full_name.clone()),
    },
    FieldSpec {
        field: "alias",
        entity: TargetEntity::Personal,
        column: "alias",
        kind: FieldKind::Text,
        current: |a| a.personal.alias.clone(),
    },
    FieldSpec {
        field: "identity_type",
        entity: TargetEntity::Personal,
        column: "identity_type",
        kind: FieldKind::Text,
        current: |a| a.personal.identity_type.clone(),
    },
    FieldSpec {
        field: "identity_number",
        entity: TargetEntity::Personal,
        column: "identity_number",
        kind: FieldKind::Text,
        current: |a| Some(a.personal.identity_number.clone()),
    },
    FieldSpec {
        field: "identity_valid_until",
        entity: TargetEntity::Personal,
        column: "identity_valid_until",
        kind: FieldKind::Date,
        current: |a| a.personal.identity_valid_until.map(|d| d.to_string()),
    },
    FieldSpec {
        field: "birth_place",
        entity: TargetEntity::Personal,
        column: "birth_place",
        kind: FieldKind::Text,
        current: |a| a.personal.birth_place.clone(),
    },
    FieldSpec {
        field: "birth_date",
        entity: TargetEntity::Personal,
        column: "birth_date",
        kind: FieldKind::Date,
        current: |a| Some(a.personal.birth_date.to_string()),
    },
    FieldSpec {
        field: "address",
        entity: TargetEntity::Personal,
        column: "address",
        kind: FieldKind::Text,
        current: |a| a.personal.address.clone(),
    },
    FieldSpec {
        field: "village",
        entity: TargetEntity::Personal,
        column: "village",
        kind: FieldKind::Text,
        current: |a| a.personal.village.clone(),
    },
    FieldSpec {
        field: "district",
        entity: TargetEntity::Personal,
        column: "district",
        kind: FieldKind::Text,
        current: |a| a.personal.district.clone(),
    },
    FieldSpec {
        field: "city",
        entity: TargetEntity::Personal,
        column: "city",
        kind: FieldKind::Text,
        current: |a| a.personal.city.clone(),
    },
    FieldSpec {
        field: "province",
        entity: TargetEntity::Personal,
        column: "province",
        kind: FieldKind::Text,
        current: |a| a.personal.province.clone(),
    },
    FieldSpec {
        field: "postal_code",
        entity: TargetEntity::Personal,
        column: "postal_code",
        kind: FieldKind::Text,
        current: |a| a.personal.postal_code.clone(),
    },
    FieldSpec {
        field: "email",
        entity: TargetEntity::Personal,
        column: "email",
        kind: FieldKind::Text,
        current: |a| Some(a.personal.email.clone()),
    },
    FieldSpec {
        field: "phone",
        entity: TargetEntity::Personal,
        column: "phone",
        kind: FieldKind::Text,
        current: |a| Some(a.personal.phone.clone()),
    },
    FieldSpec {
        field: "citizenship",
        entity: TargetEntity::Personal,
        column: "citizenship",
        kind: FieldKind::Text,
        current: |a| a.personal.citizenship.clone(),
    },
    FieldSpec {
        field: "marital_status",
        entity: TargetEntity::Personal,
        column: "marital_status",
        kind: FieldKind::Text,
        current: |a| a.personal.marital_status.clone(),
    },
    FieldSpec {
        field: "religion",
        entity: TargetEntity::Personal,
        column: "religion",
        kind: FieldKind::Text,
        current: |a| a.personal.religion.clone(),
    },
    FieldSpec {
        field: "education",
        entity: TargetEntity::Personal,
        column: "education",
        kind: FieldKind::Text,
        current: |a| a.personal.education.clone(),
    },
    FieldSpec {
        field: "mother_name",
        entity: TargetEntity::Personal,
        column: "mother_name",
        kind: FieldKind::Text,
        current: |a| a.personal.mother_name.clone(),
    },
    FieldSpec {
        field: "tax_id",
        entity: TargetEntity::Personal,
        column: "tax_id",
        kind: FieldKind::Text,
        current: |a| a.personal.tax_id.clone(),
    },
    FieldSpec {
        field: "account_for_self",
        entity: TargetEntity::Personal,
        column: "account_for_self",
        kind: FieldKind::Bool,
        current: |a| Some(a.personal.account_for_self.to_string()),
    },
    FieldSpec {
        field: "customer_type",
        entity: TargetEntity::Personal,
        column: "customer_type",
        kind: FieldKind::Text,
        current: |a| Some(a.personal.customer_type.to_string()),
    },
    FieldSpec {
        field: "legacy_account_number",
        entity: TargetEntity::Personal,
        column: "legacy_account_number",
        kind: FieldKind::Text,
        current: |a| a.personal.legacy_account_number.clone(),
    },
    // -- employment_profiles -------------------------------------------------
    FieldSpec {
        field: "occupation",
        entity: TargetEntity::Employment,
        column: "occupation",
        kind: FieldKind::Text,
        current: |a| a.employment.occupation.clone(),
    },
    FieldSpec {
        field: "employer_name",
        entity: TargetEntity::Employment,
        column: "employer_name",
        kind: FieldKind::Text,
        current: |a| a.employment.employer_name.clone(),
    },
    FieldSpec {
        field: "employer_address",
        entity: TargetEntity::Employment,
        column: "employer_address",
        kind: FieldKind::Text,
        current: |a| a.employment.employer_address.clone(),
    },
    FieldSpec {
        field: "employer_phone",
        entity: TargetEntity::Employment,
        column: "employer_phone",
        kind: FieldKind::Text,
        current: |a| a.employment.employer_phone.clone(),
    },
    FieldSpec {
        field: "position",
        entity: TargetEntity::Employment,
        column: "position",
        kind: FieldKind::Text,
        current: |a| a.employment.position.clone(),
    },
    FieldSpec {
        field: "business_field",
        entity: TargetEntity::Employment,
        column: "business_field",
        kind: FieldKind::Text,
        current: |a| a.employment.business_field.clone(),
    },
    FieldSpec {
        field: "income_bracket",
        entity: TargetEntity::Employment,
        column: "income_bracket",
        kind: FieldKind::Text,
        current: |a| a.employment.income_bracket.clone(),
    },
    FieldSpec {
        field: "fund_source",
        entity: TargetEntity::Employment,
        column: "fund_source",
        kind: FieldKind::Text,
        current: |a| a.employment.fund_source.clone(),
    },
    FieldSpec {
        field: "monthly_transaction_volume",
        entity: TargetEntity::Employment,
        column: "monthly_transaction_volume",
        kind: FieldKind::Currency,
        current: |a| a.employment.monthly_transaction_volume.map(canonical_decimal),
    },
    // -- account_configs -----------------------------------------------------
    FieldSpec {
        field: "product_type",
        entity: TargetEntity::Account,
        column: "product_type",
        kind: FieldKind::Text,
        current: |a| a.account.product_type.clone(),
    },
    FieldSpec {
        field: "card_type",
        entity: TargetEntity::Account,
        column: "card_type",
        kind: FieldKind::Text,
        current: |a| a.account.card_type.clone(),
    },
    FieldSpec {
        field: "has_card",
        entity: TargetEntity::Account,
        column: "has_card",
        kind: FieldKind::Bool,
        current: |a| Some(a.account.has_card.to_string()),
    },
    FieldSpec {
        field: "opening_deposit",
        entity: TargetEntity::Account,
        column: "opening_deposit",
        kind: FieldKind::Currency,
        current: |a| a.account.opening_deposit.map(canonical_decimal),
    },
    FieldSpec {
        field: "account_purpose",
        entity: TargetEntity::Account,
        column: "account_purpose",
        kind: FieldKind::Text,
        current: |a| a.account.account_purpose.clone(),
    },
    // -- emergency_contacts --------------------------------------------------
    FieldSpec {
        field: "emergency_contact_name",
        entity: TargetEntity::EmergencyContact,
        column: "name",
        kind: FieldKind::Text,
        current: |a| a.emergency_contact.as_ref().and_then(|c| c.name.clone()),
    },
    FieldSpec {
        field: "emergency_contact_address",
        entity: TargetEntity::EmergencyContact,
        column: "address",
        kind: FieldKind::Text,
        current: |a| a.emergency_contact.as_ref().and_then(|c| c.address.clone()),
    },
    FieldSpec {
        field: "emergency_contact_phone",
        entity: TargetEntity::EmergencyContact,
        column: "phone",
        kind: FieldKind::Text,
        current: |a| a.emergency_contact.as_ref().and_then(|c| c.phone.clone()),
    },
    FieldSpec {
        field: "emergency_contact_relationship",
        entity: TargetEntity::EmergencyContact,
        column: "relationship",
        kind: FieldKind::Text,
        current: |a| {
            a.emergency_contact
                .as_ref()
                .and_then(|c| c.relationship.clone())
        },
    },
    // -- beneficial_owners ---------------------------------------------------
    FieldSpec {
        field: "bo_name",
        entity: TargetEntity::BeneficialOwner,
        column: "full_name",
        kind: FieldKind::Text,
        current: |a| a.beneficial_owner.as_ref().map(|b| b.full_name.clone()),
    },
    FieldSpec {
        field: "bo_identity_number",
        entity: TargetEntity::BeneficialOwner,
        column: "identity_number",
        kind: FieldKind::Text,
        current: |a| {
            a.beneficial_owner
                .as_ref()
                .and_then(|b| b.identity_number.clone())
        },
    },
    FieldSpec {
        field: "bo_address",
        entity: TargetEntity::BeneficialOwner,
        column: "address",
        kind: FieldKind::Text,
        current: |a| a.beneficial_owner.as_ref().and_then(|b| b.address.clone()),
    },
    FieldSpec {
        field: "bo_phone",
        entity: TargetEntity::BeneficialOwner,
        column: "phone",
        kind: FieldKind::Text,
        current: |a| a.beneficial_owner.as_ref().and_then(|b| b.phone.clone()),
    },
    FieldSpec {
        field: "bo_occupation",
        entity: TargetEntity::BeneficialOwner,
        column: "occupation",
        kind: FieldKind::Text,
        current: |a| {
            a.beneficial_owner
                .as_ref()
                .and_then(|b| b.occupation.clone())
        },
    },
    FieldSpec {
        field: "bo_relationship",
        entity: TargetEntity::BeneficialOwner,
        column: "relationship",
        kind: FieldKind::Text,
        current: |a| {
            a.beneficial_owner
                .as_ref()
                .and_then(|b| b.relationship.clone())
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_finds_known_fields() {
        let spec = lookup("opening_deposit").expect("field registered");
        assert_eq!(spec.entity, TargetEntity::Account);
        assert_eq!(spec.kind, FieldKind::Currency);
        assert!(lookup("no_such_field").is_none());
    }

    #[test]
    fn field_names_are_unique() {
        for (i, spec) in EDIT_FIELDS.iter().enumerate() {
            assert!(
                !EDIT_FIELDS[i + 1..].iter().any(|s| s.field == spec.field),
                "duplicate field {}",
                spec.field
            );
        }
    }

    #[test]
    fn currency_normalization_matches_canonical_form() {
        let staged = normalize_value(FieldKind::Currency, &json!("Rp 1.500.000"));
        assert_eq!(staged.canonical(), Some("1500000".to_string()));
    }

    #[test]
    fn text_normalization_trims_and_nulls_empty() {
        assert_eq!(
            normalize_value(FieldKind::Text, &json!("  Ani ")).canonical(),
            Some("Ani".to_string())
        );
        assert_eq!(normalize_value(FieldKind::Text, &json!("   ")).canonical(), None);
        assert_eq!(normalize_value(FieldKind::Text, &json!(null)).canonical(), None);
    }

    #[test]
    fn bool_canonical_matches_stored_representation() {
        assert_eq!(
            normalize_value(FieldKind::Bool, &json!("1")).canonical(),
            Some("true".to_string())
        );
        assert_eq!(
            normalize_value(FieldKind::Bool, &json!("no")).canonical(),
            Some("false".to_string())
        );
    }

    #[test]
    fn optional_row_entities_are_flagged() {
        assert!(TargetEntity::BeneficialOwner.is_optional_row());
        assert!(TargetEntity::EmergencyContact.is_optional_row());
        assert!(!TargetEntity::Personal.is_optional_row());
    }
}
