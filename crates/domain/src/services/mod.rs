//! Entitlement services.
//!
//! Each service holds only injected handles; all state lives behind the
//! [`EntitlementStore`](crate::store::EntitlementStore).

pub mod activity;
pub mod download_token;
pub mod hwid_reset;
pub mod invite_code;
pub mod license_key;
pub mod policy;
pub mod subscription_ledger;

pub use activity::{ActivityLog, TracingActivityLog};
#[cfg(any(test, feature = "test-support"))]
pub use activity::RecordingActivityLog;
pub use download_token::DownloadTokenService;
pub use hwid_reset::HwidResetThrottle;
pub use invite_code::InviteCodeRegistry;
pub use license_key::LicenseKeyService;
pub use policy::EntitlementPolicy;
pub use subscription_ledger::SubscriptionLedger;

use crate::error::{EntitlementError, EntitlementResult};
use crate::store::StoreTransaction;

/// Rolls back a transaction whose work failed. A rollback error is only
/// logged; the original failure is what the caller needs to see.
pub(crate) async fn abandon(tx: Box<dyn StoreTransaction>, operation: &'static str) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(operation, error = %err, "Transaction rollback failed");
    }
}

/// Maps a `validator` field check onto the domain error.
pub(crate) fn check(result: Result<(), validator::ValidationError>) -> EntitlementResult<()> {
    result.map_err(|e| {
        EntitlementError::Validation(
            e.message
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string()),
        )
    })
}
