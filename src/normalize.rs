//! Field normalizer for loosely-shaped onboarding records
//!
//! External input (web forms, spreadsheet exports, batch files) arrives as
//! JSON objects whose keys drifted across deployments — the same logical
//! field may appear as `nama`, `nama_lengkap` or `full_name`. Every field is
//! resolved exactly once, at ingestion, over an ordered alias list; all
//! downstream code consumes the canonical [`NormalizedInput`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::CustomerType;

/// Upper bound of NUMERIC(15,2). Values above it are capped, not rejected —
/// long-standing behavior that callers depend on for oversized spreadsheet
/// amounts.
pub fn currency_cap() -> Decimal {
    Decimal::new(999_999_999_999_999, 2)
}

// ============================================================================
// Resolution primitives
// ============================================================================

/// First value under any alias that is non-null and non-empty.
fn first_present<'a>(record: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    let map = record.as_object()?;
    for key in aliases {
        match map.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.trim().is_empty() => continue,
            Some(v) => return Some(v),
        }
    }
    None
}

/// Resolve a text field. Numbers are accepted and stringified because
/// spreadsheet exports routinely lose the string type on id-like columns.
pub fn resolve_text(record: &Value, aliases: &[&str]) -> Option<String> {
    match first_present(record, aliases)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Resolve a currency field: strip every non-digit formatting character,
/// parse the remaining digits, null on non-numeric, cap at NUMERIC(15,2).
pub fn resolve_currency(record: &Value, aliases: &[&str]) -> Option<Decimal> {
    let raw = match first_present(record, aliases)? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    parse_currency(&raw)
}

pub fn parse_currency(raw: &str) -> Option<Decimal> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    // More digits than the column holds always exceeds the cap
    if digits.len() > 15 {
        return Some(currency_cap());
    }
    let amount = Decimal::from_i128_with_scale(digits.parse::<i128>().ok()?, 0);
    Some(amount.min(currency_cap()))
}

/// Resolve a date field. Empty strings normalize to null; the only accepted
/// shape is ISO `YYYY-MM-DD`.
pub fn resolve_date(record: &Value, aliases: &[&str]) -> Option<NaiveDate> {
    match first_present(record, aliases)? {
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

/// Resolve a timestamp carried in batch records (approval/rejection times).
pub fn resolve_datetime(record: &Value, aliases: &[&str]) -> Option<DateTime<Utc>> {
    let raw = match first_present(record, aliases)? {
        Value::String(s) => s.clone(),
        _ => return None,
    };
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Resolve a boolean: JSON true, "true" or "1" mean true, everything else
/// false. `default` applies only when no alias is present at all.
pub fn resolve_bool(record: &Value, aliases: &[&str], default: bool) -> bool {
    match first_present(record, aliases) {
        None => default,
        Some(v) => parse_bool(v),
    }
}

pub fn parse_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim(), "true" | "1"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Resolve an integer field (branch ids), accepting numbers or numeric text.
pub fn resolve_int(record: &Value, aliases: &[&str]) -> Option<i64> {
    match first_present(record, aliases)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Alias tables
// ============================================================================

pub const FULL_NAME: &[&str] = &["nama_lengkap", "nama", "full_name", "name"];
pub const ALIAS: &[&str] = &["nama_alias", "alias"];
pub const IDENTITY_TYPE: &[&str] = &["jenis_identitas", "identity_type"];
pub const IDENTITY_NUMBER: &[&str] = &["nomor_identitas", "nik", "identity_number", "identityNumber"];
pub const IDENTITY_VALID_UNTIL: &[&str] = &["masa_berlaku_identitas", "identity_valid_until"];
pub const BIRTH_PLACE: &[&str] = &["tempat_lahir", "birth_place"];
pub const BIRTH_DATE: &[&str] = &["tanggal_lahir", "birth_date", "birthDate"];
pub const ADDRESS: &[&str] = &["alamat", "address"];
pub const VILLAGE: &[&str] = &["kelurahan", "village"];
pub const DISTRICT: &[&str] = &["kecamatan", "district"];
pub const CITY: &[&str] = &["kota", "city"];
pub const PROVINCE: &[&str] = &["provinsi", "province"];
pub const POSTAL_CODE: &[&str] = &["kode_pos", "postal_code"];
pub const EMAIL: &[&str] = &["email", "alamat_email"];
pub const PHONE: &[&str] = &["no_hp", "telepon", "phone"];
pub const CITIZENSHIP: &[&str] = &["kewarganegaraan", "citizenship"];
pub const MARITAL_STATUS: &[&str] = &["status_pernikahan", "marital_status"];
pub const RELIGION: &[&str] = &["agama", "religion"];
pub const EDUCATION: &[&str] = &["pendidikan", "education"];
pub const MOTHER_NAME: &[&str] = &["nama_ibu_kandung", "nama_ibu", "mother_name"];
pub const TAX_ID: &[&str] = &["npwp", "tax_id"];
pub const ACCOUNT_FOR_SELF: &[&str] = &["rekening_untuk_sendiri", "account_for_self", "accountForSelf"];
pub const CUSTOMER_TYPE: &[&str] = &["tipe_nasabah", "customer_type"];
pub const LEGACY_ACCOUNT_NUMBER: &[&str] = &["nomor_rekening_lama", "legacy_account_number"];

pub const OCCUPATION: &[&str] = &["pekerjaan", "occupation"];
pub const EMPLOYER_NAME: &[&str] = &["nama_perusahaan", "employer_name"];
pub const EMPLOYER_ADDRESS: &[&str] = &["alamat_perusahaan", "employer_address"];
pub const EMPLOYER_PHONE: &[&str] = &["telepon_perusahaan", "employer_phone"];
pub const POSITION: &[&str] = &["jabatan", "position"];
pub const BUSINESS_FIELD: &[&str] = &["bidang_usaha", "business_field"];
pub const INCOME_BRACKET: &[&str] = &["penghasilan", "income_bracket"];
pub const FUND_SOURCE: &[&str] = &["sumber_dana", "fund_source"];
pub const MONTHLY_VOLUME: &[&str] = &["rata_rata_transaksi", "monthly_transaction_volume"];

pub const PRODUCT_TYPE: &[&str] = &["jenis_tabungan", "product_type"];
pub const CARD_TYPE: &[&str] = &["jenis_kartu", "card_type"];
pub const HAS_CARD: &[&str] = &["pakai_kartu", "has_card"];
pub const OPENING_DEPOSIT: &[&str] = &["setoran_awal", "opening_deposit"];
pub const ACCOUNT_PURPOSE: &[&str] = &["tujuan_pembukaan", "account_purpose"];

pub const BRANCH_ID: &[&str] = &["branch_id", "id_cabang", "branchId"];

pub const EC_NAME: &[&str] = &["nama_kontak_darurat", "emergency_contact_name"];
pub const EC_ADDRESS: &[&str] = &["alamat_kontak_darurat", "emergency_contact_address"];
pub const EC_PHONE: &[&str] = &["telepon_kontak_darurat", "emergency_contact_phone"];
pub const EC_RELATIONSHIP: &[&str] = &["hubungan_kontak_darurat", "emergency_contact_relationship"];

pub const BO_NAME: &[&str] = &["nama_bo", "bo_name", "beneficial_owner_name"];
pub const BO_IDENTITY_NUMBER: &[&str] = &["nomor_identitas_bo", "bo_identity_number"];
pub const BO_ADDRESS: &[&str] = &["alamat_bo", "bo_address"];
pub const BO_PHONE: &[&str] = &["telepon_bo", "bo_phone"];
pub const BO_OCCUPATION: &[&str] = &["pekerjaan_bo", "bo_occupation"];
pub const BO_RELATIONSHIP: &[&str] = &["hubungan_bo", "bo_relationship"];

pub const OTHER_BANK_HOLDINGS: &[&str] = &["rekening_bank_lain", "other_bank_holdings"];
pub const HOLDING_BANK_NAME: &[&str] = &["nama_bank", "bank_name"];
pub const HOLDING_ACCOUNT_TYPE: &[&str] = &["jenis_rekening", "account_type"];
pub const HOLDING_ACCOUNT_NUMBER: &[&str] = &["nomor_rekening", "account_number"];

pub const OTHER_OCCUPATIONS: &[&str] = &["pekerjaan_lain", "other_occupations"];
pub const OCCUPATION_DESCRIPTION: &[&str] = &["keterangan", "description", "usage"];

// ============================================================================
// Canonical input record
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalInput {
    pub full_name: Option<String>,
    pub alias: Option<String>,
    pub identity_type: Option<String>,
    pub identity_number: Option<String>,
    pub identity_valid_until: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
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

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmploymentInput {
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

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountInput {
    pub product_type: Option<String>,
    pub card_type: Option<String>,
    pub has_card: bool,
    pub opening_deposit: Option<Decimal>,
    pub account_purpose: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmergencyContactInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

impl EmergencyContactInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.phone.is_none()
            && self.relationship.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeneficialOwnerInput {
    pub full_name: Option<String>,
    pub identity_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub occupation: Option<String>,
    pub relationship: Option<String>,
}

/// Complete other-bank entry; entries missing any of the three fields are
/// dropped during normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankHoldingInput {
    pub bank_name: String,
    pub account_type: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupationInput {
    pub description: String,
}

/// One canonical record, consumed by the writer and the import pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedInput {
    pub branch_id: Option<i64>,
    pub personal: PersonalInput,
    pub employment: EmploymentInput,
    pub account: AccountInput,
    pub emergency_contact: EmergencyContactInput,
    pub beneficial_owner: BeneficialOwnerInput,
    pub other_bank_holdings: Vec<BankHoldingInput>,
    pub other_occupations: Vec<OccupationInput>,
}

/// Normalize one loosely-shaped record into the canonical shape.
pub fn normalize_record(raw: &Value) -> NormalizedInput {
    let personal = PersonalInput {
        full_name: resolve_text(raw, FULL_NAME),
        alias: resolve_text(raw, ALIAS),
        identity_type: resolve_text(raw, IDENTITY_TYPE),
        identity_number: resolve_text(raw, IDENTITY_NUMBER),
        identity_valid_until: resolve_date(raw, IDENTITY_VALID_UNTIL),
        birth_place: resolve_text(raw, BIRTH_PLACE),
        birth_date: resolve_date(raw, BIRTH_DATE),
        address: resolve_text(raw, ADDRESS),
        village: resolve_text(raw, VILLAGE),
        district: resolve_text(raw, DISTRICT),
        city: resolve_text(raw, CITY),
        province: resolve_text(raw, PROVINCE),
        postal_code: resolve_text(raw, POSTAL_CODE),
        email: resolve_text(raw, EMAIL),
        phone: resolve_text(raw, PHONE),
        citizenship: resolve_text(raw, CITIZENSHIP),
        marital_status: resolve_text(raw, MARITAL_STATUS),
        religion: resolve_text(raw, RELIGION),
        education: resolve_text(raw, EDUCATION),
        mother_name: resolve_text(raw, MOTHER_NAME),
        tax_id: resolve_text(raw, TAX_ID),
        account_for_self: resolve_bool(raw, ACCOUNT_FOR_SELF, true),
        customer_type: resolve_text(raw, CUSTOMER_TYPE)
            .and_then(|s| CustomerType::parse(&s))
            .unwrap_or_default(),
        legacy_account_number: resolve_text(raw, LEGACY_ACCOUNT_NUMBER),
    };

    let employment = EmploymentInput {
        occupation: resolve_text(raw, OCCUPATION),
        employer_name: resolve_text(raw, EMPLOYER_NAME),
        employer_address: resolve_text(raw, EMPLOYER_ADDRESS),
        employer_phone: resolve_text(raw, EMPLOYER_PHONE),
        position: resolve_text(raw, POSITION),
        business_field: resolve_text(raw, BUSINESS_FIELD),
        income_bracket: resolve_text(raw, INCOME_BRACKET),
        fund_source: resolve_text(raw, FUND_SOURCE),
        monthly_transaction_volume: resolve_currency(raw, MONTHLY_VOLUME),
    };

    let account = AccountInput {
        product_type: resolve_text(raw, PRODUCT_TYPE),
        card_type: resolve_text(raw, CARD_TYPE),
        has_card: resolve_bool(raw, HAS_CARD, false),
        opening_deposit: resolve_currency(raw, OPENING_DEPOSIT),
        account_purpose: resolve_text(raw, ACCOUNT_PURPOSE),
    };

    let emergency_contact = EmergencyContactInput {
        name: resolve_text(raw, EC_NAME),
        address: resolve_text(raw, EC_ADDRESS),
        phone: resolve_text(raw, EC_PHONE),
        relationship: resolve_text(raw, EC_RELATIONSHIP),
    };

    let beneficial_owner = BeneficialOwnerInput {
        full_name: resolve_text(raw, BO_NAME),
        identity_number: resolve_text(raw, BO_IDENTITY_NUMBER),
        address: resolve_text(raw, BO_ADDRESS),
        phone: resolve_text(raw, BO_PHONE),
        occupation: resolve_text(raw, BO_OCCUPATION),
        relationship: resolve_text(raw, BO_RELATIONSHIP),
    };

    NormalizedInput {
        branch_id: resolve_int(raw, BRANCH_ID),
        personal,
        employment,
        account,
        emergency_contact,
        beneficial_owner,
        other_bank_holdings: normalize_bank_holdings(raw),
        other_occupations: normalize_other_occupations(raw),
    }
}

fn normalize_bank_holdings(raw: &Value) -> Vec<BankHoldingInput> {
    first_present(raw, OTHER_BANK_HOLDINGS)
        .map(parse_bank_holdings)
        .unwrap_or_default()
}

fn normalize_other_occupations(raw: &Value) -> Vec<OccupationInput> {
    first_present(raw, OTHER_OCCUPATIONS)
        .map(parse_other_occupations)
        .unwrap_or_default()
}

/// Parse an other-bank array, keeping only complete entries.
pub fn parse_bank_holdings(items: &Value) -> Vec<BankHoldingInput> {
    let Some(items) = items.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            Some(BankHoldingInput {
                bank_name: resolve_text(item, HOLDING_BANK_NAME)?,
                account_type: resolve_text(item, HOLDING_ACCOUNT_TYPE)?,
                account_number: resolve_text(item, HOLDING_ACCOUNT_NUMBER)?,
            })
        })
        .collect()
}

/// Parse an other-occupation array, keeping only entries with a description.
pub fn parse_other_occupations(items: &Value) -> Vec<OccupationInput> {
    let Some(items) = items.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            Some(OccupationInput {
                description: resolve_text(item, OCCUPATION_DESCRIPTION)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alias_resolution_is_first_non_empty() {
        let record = json!({ "nama": "", "nama_lengkap": "Ani Setyawati", "name": "ignored" });
        assert_eq!(
            resolve_text(&record, FULL_NAME),
            Some("Ani Setyawati".to_string())
        );
    }

    #[test]
    fn currency_strips_formatting() {
        assert_eq!(parse_currency("Rp 1.500.000"), Some(Decimal::new(1_500_000, 0)));
        assert_eq!(parse_currency("500000"), Some(Decimal::new(500_000, 0)));
        assert_eq!(parse_currency("n/a"), None);
    }

    #[test]
    fn currency_caps_at_precision_limit() {
        let oversized = "9".repeat(20);
        assert_eq!(parse_currency(&oversized), Some(currency_cap()));
    }

    #[test]
    fn empty_date_normalizes_to_null() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("  "), None);
        assert_eq!(parse_date("2000-01-01"), NaiveDate::from_ymd_opt(2000, 1, 1));
        assert_eq!(parse_date("01/01/2000"), None);
    }

    #[test]
    fn bool_accepts_true_and_one_only() {
        assert!(parse_bool(&json!(true)));
        assert!(parse_bool(&json!("true")));
        assert!(parse_bool(&json!("1")));
        assert!(parse_bool(&json!(1)));
        assert!(!parse_bool(&json!("yes")));
        assert!(!parse_bool(&json!("TRUE")));
        assert!(!parse_bool(&json!(0)));
    }

    #[test]
    fn account_for_self_defaults_true() {
        let input = normalize_record(&json!({ "nama": "Budi" }));
        assert!(input.personal.account_for_self);

        let input = normalize_record(&json!({ "nama": "Budi", "account_for_self": "0" }));
        assert!(!input.personal.account_for_self);
    }

    #[test]
    fn incomplete_bank_holdings_are_dropped() {
        let record = json!({
            "rekening_bank_lain": [
                { "nama_bank": "Bank A", "jenis_rekening": "tabungan", "nomor_rekening": "123" },
                { "nama_bank": "Bank B", "jenis_rekening": "giro" },
            ]
        });
        let holdings = normalize_bank_holdings(&record);
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].bank_name, "Bank A");
    }

    #[test]
    fn other_occupations_need_a_description() {
        let record = json!({
            "pekerjaan_lain": [
                { "keterangan": "Usaha warung" },
                { "catatan": "no description key" },
            ]
        });
        let occupations = normalize_other_occupations(&record);
        assert_eq!(occupations.len(), 1);
        assert_eq!(occupations[0].description, "Usaha warung");
    }

    #[test]
    fn numeric_identity_number_is_stringified() {
        let record = json!({ "nik": 3271010101010001u64 });
        assert_eq!(
            resolve_text(&record, IDENTITY_NUMBER),
            Some("3271010101010001".to_string())
        );
    }

    #[test]
    fn datetime_accepts_rfc3339_and_sql_shapes() {
        assert!(resolve_datetime(&json!({"approved_at": "2025-06-01T10:00:00Z"}), &["approved_at"]).is_some());
        assert!(resolve_datetime(&json!({"approved_at": "2025-06-01 10:00:00"}), &["approved_at"]).is_some());
        assert!(resolve_datetime(&json!({"approved_at": "yesterday"}), &["approved_at"]).is_none());
    }
}
