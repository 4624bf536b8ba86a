//! Registration invite code domain model.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SEGMENT_LENGTH: usize = 4;
const SEGMENT_COUNT: usize = 3;

/// A single-use code gating new-account registration.
///
/// `used_by` goes from `None` to `Some` exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteCode {
    pub code: String,
    pub created_by: Uuid,
    pub used_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InviteCode {
    pub fn is_available(&self) -> bool {
        self.used_by.is_none()
    }
}

/// Request to create a batch of invite codes.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateInviteCodesRequest {
    #[validate(range(min = 1, max = 100, message = "count must be between 1 and 100"))]
    pub count: u32,
}

/// Response for invite code validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteCodeValidity {
    pub code: String,
    pub valid: bool,
}

lazy_static::lazy_static! {
    pub static ref INVITE_CODE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Z0-9]{4}-[A-Z0-9]{4}-[A-Z0-9]{4}$").unwrap();
}

/// Generate a random invite code in XXXX-XXXX-XXXX format.
pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();

    let segments: Vec<String> = (0..SEGMENT_COUNT)
        .map(|_| {
            (0..SEGMENT_LENGTH)
                .map(|_| {
                    let idx = rng.gen_range(0..INVITE_CODE_ALPHABET.len());
                    INVITE_CODE_ALPHABET[idx] as char
                })
                .collect()
        })
        .collect();

    segments.join("-")
}

/// Whether a (normalized) code has the invite code shape.
pub fn is_well_formed(code: &str) -> bool {
    INVITE_CODE_REGEX.is_match(code)
}
