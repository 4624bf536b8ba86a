//! Storage ports.
//!
//! Every exactly-once guarantee is enforced here, either by a single
//! conditional statement whose affected-row count is the success signal or
//! by a [`StoreTransaction`] wrapping a short run of dependent writes.
//! Services never hold state of their own between calls.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    DownloadToken, InviteCode, LicenseKey, Loader, NewDownloadToken, NewLicenseKey, Product,
    Subscription, SubscriptionSummary, SubscriptionWrite, UserAccount,
};

pub use memory::InMemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Writes that must commit or roll back together.
///
/// Dropping a transaction without calling [`StoreTransaction::commit`] rolls
/// it back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// The store's clock as seen by this transaction.
    async fn now(&mut self) -> StoreResult<DateTime<Utc>>;

    /// Marks a key used iff it is still unused. Returns rows affected.
    async fn mark_license_key_used(&mut self, key_id: Uuid, user_id: Uuid) -> StoreResult<u64>;

    /// Serializes writers on the (user, product) pair for the rest of the
    /// transaction, whether or not a row exists yet, and returns the row.
    async fn lock_subscription(
        &mut self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<Option<Subscription>>;

    /// Inserts or updates the single row for (user, product).
    async fn save_subscription(&mut self, write: &SubscriptionWrite) -> StoreResult<Subscription>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Relational persistence seam for entitlement state.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// The store's clock. Expiry and cooldown decisions use this, never the
    /// application host's clock.
    async fn now(&self) -> StoreResult<DateTime<Utc>>;

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    // Catalog

    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>>;

    async fn find_active_loader(&self, cheat_name: &str) -> StoreResult<Option<Loader>>;

    async fn find_loader(&self, loader_id: Uuid) -> StoreResult<Option<Loader>>;

    async fn increment_download_counters(&self, loader_id: Uuid, product_id: Uuid)
        -> StoreResult<()>;

    // Users

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserAccount>>;

    /// Clears the HWID, bumps the reset counter and stamps the reset time.
    /// With `cooldown`, only applies when the last reset is at least that
    /// old. Returns rows affected.
    async fn reset_hwid(&self, user_id: Uuid, cooldown: Option<Duration>) -> StoreResult<u64>;

    // License keys

    async fn insert_license_key(&self, key: &NewLicenseKey) -> StoreResult<LicenseKey>;

    async fn find_license_key(&self, code: &str) -> StoreResult<Option<LicenseKey>>;

    // Subscriptions

    async fn find_subscription(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<Option<Subscription>>;

    /// Rows with `is_active` set and an end date still in the future.
    async fn list_active_subscriptions(&self, user_id: Uuid)
        -> StoreResult<Vec<SubscriptionSummary>>;

    /// Clears `is_active`, leaving the end date untouched. Returns rows affected.
    async fn deactivate_subscription(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<u64>;

    // Invite codes

    async fn insert_invite_code(&self, code: &str, created_by: Uuid) -> StoreResult<InviteCode>;

    async fn find_invite_code(&self, code: &str) -> StoreResult<Option<InviteCode>>;

    /// Sets `used_by` iff it is still unset. Returns rows affected.
    async fn consume_invite_code(&self, code: &str, used_by: Uuid) -> StoreResult<u64>;

    // Download tokens

    /// Deletes tokens whose expiry has passed. Returns rows deleted.
    async fn delete_expired_download_tokens(&self) -> StoreResult<u64>;

    /// The newest unconsumed, unexpired token for the pair, if any.
    async fn find_live_download_token(
        &self,
        user_id: Uuid,
        loader_id: Uuid,
    ) -> StoreResult<Option<DownloadToken>>;

    /// Persists a token expiring `ttl` after the store's current time.
    async fn insert_download_token(
        &self,
        token: &NewDownloadToken,
        ttl: Duration,
    ) -> StoreResult<DownloadToken>;

    /// The token iff it is unconsumed and unexpired.
    async fn find_usable_download_token(&self, token: &str) -> StoreResult<Option<DownloadToken>>;

    /// Stamps `used_at` iff the token is still unconsumed and unexpired.
    /// Returns rows affected.
    async fn mark_download_token_used(&self, token: &str) -> StoreResult<u64>;
}

/// Binary payloads of loader artifacts.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn fetch(&self, loader_id: Uuid) -> StoreResult<Option<Vec<u8>>>;
}
