//! Product domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix used when a product name has no usable characters.
const FALLBACK_KEY_PREFIX: &str = "KEY";

/// A product that subscriptions and license keys are issued for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Product {
    pub id: Uuid,
    /// Machine name, e.g. `fatality`.
    pub name: String,
    pub display_name: String,
    /// Administratively frozen products cannot be activated.
    pub is_frozen: bool,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Prefix for license key codes: the name upper-cased, alphanumerics only.
    pub fn key_prefix(&self) -> String {
        let prefix: String = self
            .name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if prefix.is_empty() {
            FALLBACK_KEY_PREFIX.to_string()
        } else {
            prefix
        }
    }
}
