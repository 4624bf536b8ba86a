//! License key domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::product::Product;

/// Random bytes behind the hex part of a code (16 hex characters).
const LICENSE_KEY_RANDOM_BYTES: usize = 8;

/// A single-use code redeemable for a time-boxed subscription.
///
/// Once `is_used` is set, `used_by` and `used_at` never change again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LicenseKey {
    pub id: Uuid,
    pub code: String,
    pub product_id: Uuid,
    pub duration_days: i32,
    pub is_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a freshly generated key.
#[derive(Debug, Clone)]
pub struct NewLicenseKey {
    pub code: String,
    pub product_id: Uuid,
    pub duration_days: i32,
    pub created_by: Uuid,
}

/// Record returned to the issuing admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KeyRecord {
    pub id: Uuid,
    pub code: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub duration_days: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl KeyRecord {
    pub fn new(key: LicenseKey, product: &Product) -> Self {
        Self {
            id: key.id,
            code: key.code,
            product_id: key.product_id,
            product_name: product.name.clone(),
            duration_days: key.duration_days,
            created_by: key.created_by,
            created_at: key.created_at,
        }
    }
}

/// Outcome of a successful activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActivationResult {
    pub product_name: String,
    pub display_name: String,
    pub duration_days: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// True when days were added onto a live window rather than starting fresh.
    pub extended: bool,
}

/// Request to generate license keys.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct GenerateLicenseKeysRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 3650, message = "duration_days must be between 1 and 3650"))]
    pub duration_days: i32,
    #[validate(range(min = 1, max = 100, message = "count must be between 1 and 100"))]
    #[serde(default = "default_key_count")]
    pub count: u32,
}

fn default_key_count() -> u32 {
    1
}

/// Request to activate a license key for the calling user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ActivateLicenseKeyRequest {
    #[validate(length(min = 1, max = 96, message = "Invalid license key format"))]
    pub code: String,
}

lazy_static::lazy_static! {
    pub static ref LICENSE_KEY_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Z0-9]+-[0-9A-F]{16}$").unwrap();
}

/// Builds a code in `{PREFIX}-{16 hex}` form.
pub fn generate_license_code(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        shared::crypto::random_hex_upper(LICENSE_KEY_RANDOM_BYTES)
    )
}

/// Whether a (normalized) code has the shape of a license key.
pub fn is_well_formed(code: &str) -> bool {
    LICENSE_KEY_REGEX.is_match(code)
}
