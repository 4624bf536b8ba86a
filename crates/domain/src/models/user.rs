//! User account fields consumed by the HWID reset throttle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default self-service HWID reset cooldown.
pub const DEFAULT_HWID_RESET_COOLDOWN_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hwid: Option<String>,
    pub hwid_reset_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_hwid_reset: Option<DateTime<Utc>>,
}

impl UserAccount {
    /// Whether a self-service reset is allowed at `now`.
    pub fn can_reset_hwid(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        match self.last_hwid_reset {
            None => true,
            Some(last) => now - last >= cooldown,
        }
    }

    /// When the cooldown from the last reset ends, if there was one.
    pub fn cooldown_ends_at(&self, cooldown: Duration) -> Option<DateTime<Utc>> {
        self.last_hwid_reset.map(|last| last + cooldown)
    }
}

/// Read-only projection of a user's HWID reset state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HwidStatus {
    pub reset_count: i32,
    pub last_reset: Option<DateTime<Utc>>,
    pub can_reset: bool,
    /// Set only while a reset is still on cooldown.
    pub next_eligible_at: Option<DateTime<Utc>>,
    pub hwid_bound: bool,
}

impl HwidStatus {
    pub fn evaluate(user: &UserAccount, now: DateTime<Utc>, cooldown: Duration) -> Self {
        let can_reset = user.can_reset_hwid(now, cooldown);
        Self {
            reset_count: user.hwid_reset_count,
            last_reset: user.last_hwid_reset,
            can_reset,
            next_eligible_at: if can_reset {
                None
            } else {
                user.cooldown_ends_at(cooldown)
            },
            hwid_bound: user.hwid.is_some(),
        }
    }
}
