//! Download token domain model.
//!
//! Tokens move from Issued to exactly one of Consumed (terminal) or Expired
//! (terminal). Nothing leaves a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Random bytes per token (256 bits, 64 hex characters).
pub const DOWNLOAD_TOKEN_BYTES: usize = 32;

/// Default lifetime of an issued token.
pub const DEFAULT_DOWNLOAD_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DownloadToken {
    pub token: String,
    pub user_id: Uuid,
    pub loader_id: Uuid,
    pub cheat_name: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadTokenState {
    Issued,
    Consumed,
    Expired,
}

impl DownloadToken {
    pub fn state(&self, now: DateTime<Utc>) -> DownloadTokenState {
        if self.used_at.is_some() {
            DownloadTokenState::Consumed
        } else if now >= self.expires_at {
            DownloadTokenState::Expired
        } else {
            DownloadTokenState::Issued
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == DownloadTokenState::Issued
    }
}

/// Input for persisting a freshly minted token. The expiry is computed by
/// the store from its own clock.
#[derive(Debug, Clone)]
pub struct NewDownloadToken {
    pub token: String,
    pub user_id: Uuid,
    pub loader_id: Uuid,
    pub cheat_name: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Result of issuing (or re-serving) a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IssuedDownloadToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub filename: String,
    pub size: i64,
    pub reused: bool,
}

/// The released artifact.
#[derive(Clone)]
pub struct DownloadPayload {
    pub payload: Vec<u8>,
    pub filename: String,
    pub size: i64,
}

impl std::fmt::Debug for DownloadPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadPayload")
            .field("filename", &self.filename)
            .field("size", &self.size)
            .field("payload", &format_args!("[{} bytes]", self.payload.len()))
            .finish()
    }
}

/// Generate a new 256-bit hex token.
pub fn generate_token() -> String {
    shared::crypto::random_hex(DOWNLOAD_TOKEN_BYTES)
}

/// Whether a string could be a token we issued.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == DOWNLOAD_TOKEN_BYTES * 2
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
