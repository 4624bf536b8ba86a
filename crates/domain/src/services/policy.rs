//! Tunables shared by the entitlement services.

use chrono::Duration;

use crate::models::download_token::DEFAULT_DOWNLOAD_TOKEN_TTL_MINUTES;
use crate::models::user::DEFAULT_HWID_RESET_COOLDOWN_DAYS;

/// Upper bound on codes minted per invite batch request.
pub const DEFAULT_INVITE_BATCH_MAX: u32 = 100;

/// Attempts at minting a unique code before giving up.
pub const DEFAULT_CODE_GENERATION_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitlementPolicy {
    pub download_token_ttl: Duration,
    pub hwid_reset_cooldown: Duration,
    pub invite_batch_max: u32,
    pub code_generation_attempts: u32,
}

impl Default for EntitlementPolicy {
    fn default() -> Self {
        Self {
            download_token_ttl: Duration::minutes(DEFAULT_DOWNLOAD_TOKEN_TTL_MINUTES),
            hwid_reset_cooldown: Duration::days(DEFAULT_HWID_RESET_COOLDOWN_DAYS),
            invite_batch_max: DEFAULT_INVITE_BATCH_MAX,
            code_generation_attempts: DEFAULT_CODE_GENERATION_ATTEMPTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = EntitlementPolicy::default();
        assert_eq!(policy.download_token_ttl, Duration::minutes(30));
        assert_eq!(policy.hwid_reset_cooldown, Duration::days(14));
        assert_eq!(policy.invite_batch_max, 100);
    }
}
