//! Wires the five services over one store.

use std::sync::Arc;

use crate::services::{
    ActivityLog, DownloadTokenService, EntitlementPolicy, HwidResetThrottle, InviteCodeRegistry,
    LicenseKeyService, SubscriptionLedger,
};
use crate::store::{BlobStore, EntitlementStore};

#[derive(Clone)]
pub struct EntitlementEngine {
    pub license_keys: LicenseKeyService,
    pub subscriptions: SubscriptionLedger,
    pub hwid: HwidResetThrottle,
    pub invites: InviteCodeRegistry,
    pub downloads: DownloadTokenService,
    store: Arc<dyn EntitlementStore>,
}

impl EntitlementEngine {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        blobs: Arc<dyn BlobStore>,
        activity: Arc<dyn ActivityLog>,
        policy: EntitlementPolicy,
    ) -> Self {
        let subscriptions = SubscriptionLedger::new(store.clone(), activity.clone());
        Self {
            license_keys: LicenseKeyService::new(
                store.clone(),
                subscriptions.clone(),
                activity.clone(),
                policy.code_generation_attempts,
            ),
            hwid: HwidResetThrottle::new(
                store.clone(),
                activity.clone(),
                policy.hwid_reset_cooldown,
            ),
            invites: InviteCodeRegistry::new(
                store.clone(),
                activity.clone(),
                policy.invite_batch_max,
                policy.code_generation_attempts,
            ),
            downloads: DownloadTokenService::new(
                store.clone(),
                blobs,
                activity,
                policy.download_token_ttl,
                policy.code_generation_attempts,
            ),
            subscriptions,
            store,
        }
    }

    /// The underlying store, for health probes.
    pub fn store(&self) -> &Arc<dyn EntitlementStore> {
        &self.store
    }
}
