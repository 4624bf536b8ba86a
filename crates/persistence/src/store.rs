//! PostgreSQL implementations of the domain storage ports.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::metrics::QueryTimer;
use crate::repositories::{
    ActivityLogRepository, DownloadTokenInput, DownloadTokenRepository, InviteCodeRepository,
    LicenseKeyRepository, LoaderRepository, ProductRepository, SubscriptionRepository,
    UserRepository,
};
use domain::models::{
    ActivityEntry, DownloadToken, InviteCode, LicenseKey, Loader, NewDownloadToken, NewLicenseKey,
    Product, Subscription, SubscriptionSummary, SubscriptionWrite, UserAccount,
};
use domain::services::{ActivityLog, TracingActivityLog};
use domain::store::{
    BlobStore, EntitlementStore, StoreError, StoreResult, StoreTransaction,
};

/// PostgreSQL error code for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a driver error onto the port's error kinds.
pub fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Duplicate(db_err.constraint().unwrap_or("unique").to_string());
        }
    }
    StoreError::Unavailable(err.to_string())
}

/// [`EntitlementStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgEntitlementStore {
    pool: PgPool,
    products: ProductRepository,
    loaders: LoaderRepository,
    users: UserRepository,
    license_keys: LicenseKeyRepository,
    subscriptions: SubscriptionRepository,
    invite_codes: InviteCodeRepository,
    download_tokens: DownloadTokenRepository,
}

impl PgEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            products: ProductRepository::new(pool.clone()),
            loaders: LoaderRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            license_keys: LicenseKeyRepository::new(pool.clone()),
            subscriptions: SubscriptionRepository::new(pool.clone()),
            invite_codes: InviteCodeRepository::new(pool.clone()),
            download_tokens: DownloadTokenRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A database transaction. Dropping it without commit rolls back.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn now(&mut self) -> StoreResult<DateTime<Utc>> {
        sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(store_error)
    }

    async fn mark_license_key_used(&mut self, key_id: Uuid, user_id: Uuid) -> StoreResult<u64> {
        LicenseKeyRepository::mark_used(&mut self.tx, key_id, user_id)
            .await
            .map_err(store_error)
    }

    async fn lock_subscription(
        &mut self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<Option<Subscription>> {
        SubscriptionRepository::lock_for_update(&mut self.tx, user_id, product_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn save_subscription(&mut self, write: &SubscriptionWrite) -> StoreResult<Subscription> {
        SubscriptionRepository::upsert(&mut self.tx, write)
            .await
            .map(Into::into)
            .map_err(store_error)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(store_error)
    }
}

#[async_trait]
impl EntitlementStore for PgEntitlementStore {
    async fn now(&self) -> StoreResult<DateTime<Utc>> {
        let timer = QueryTimer::new("select_now");
        let result = sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result.map_err(store_error)
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
        self.products
            .find_by_id(product_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn find_active_loader(&self, cheat_name: &str) -> StoreResult<Option<Loader>> {
        self.loaders
            .find_active_by_name(cheat_name)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn find_loader(&self, loader_id: Uuid) -> StoreResult<Option<Loader>> {
        self.loaders
            .find_by_id(loader_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn increment_download_counters(
        &self,
        loader_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<()> {
        self.loaders
            .increment_download_count(loader_id)
            .await
            .map_err(store_error)?;
        self.products
            .increment_download_count(product_id)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserAccount>> {
        self.users
            .find_by_id(user_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn reset_hwid(&self, user_id: Uuid, cooldown: Option<Duration>) -> StoreResult<u64> {
        self.users
            .reset_hwid(user_id, cooldown)
            .await
            .map_err(store_error)
    }

    async fn insert_license_key(&self, key: &NewLicenseKey) -> StoreResult<LicenseKey> {
        self.license_keys
            .create(&key.code, key.product_id, key.duration_days, key.created_by)
            .await
            .map(Into::into)
            .map_err(store_error)
    }

    async fn find_license_key(&self, code: &str) -> StoreResult<Option<LicenseKey>> {
        self.license_keys
            .find_by_code(code)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn find_subscription(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<Option<Subscription>> {
        self.subscriptions
            .find(user_id, product_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn list_active_subscriptions(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<SubscriptionSummary>> {
        self.subscriptions
            .list_active(user_id)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(store_error)
    }

    async fn deactivate_subscription(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<u64> {
        self.subscriptions
            .deactivate(user_id, product_id)
            .await
            .map_err(store_error)
    }

    async fn insert_invite_code(&self, code: &str, created_by: Uuid) -> StoreResult<InviteCode> {
        self.invite_codes
            .create(code, created_by)
            .await
            .map(Into::into)
            .map_err(store_error)
    }

    async fn find_invite_code(&self, code: &str) -> StoreResult<Option<InviteCode>> {
        self.invite_codes
            .find_by_code(code)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn consume_invite_code(&self, code: &str, used_by: Uuid) -> StoreResult<u64> {
        self.invite_codes
            .consume(code, used_by)
            .await
            .map_err(store_error)
    }

    async fn delete_expired_download_tokens(&self) -> StoreResult<u64> {
        self.download_tokens
            .delete_expired()
            .await
            .map_err(store_error)
    }

    async fn find_live_download_token(
        &self,
        user_id: Uuid,
        loader_id: Uuid,
    ) -> StoreResult<Option<DownloadToken>> {
        self.download_tokens
            .find_live(user_id, loader_id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn insert_download_token(
        &self,
        token: &NewDownloadToken,
        ttl: Duration,
    ) -> StoreResult<DownloadToken> {
        self.download_tokens
            .create(DownloadTokenInput {
                token: &token.token,
                user_id: token.user_id,
                loader_id: token.loader_id,
                cheat_name: &token.cheat_name,
                ip_address: token.ip_address.as_deref(),
                user_agent: token.user_agent.as_deref(),
                ttl,
            })
            .await
            .map(Into::into)
            .map_err(store_error)
    }

    async fn find_usable_download_token(&self, token: &str) -> StoreResult<Option<DownloadToken>> {
        self.download_tokens
            .find_usable(token)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn mark_download_token_used(&self, token: &str) -> StoreResult<u64> {
        self.download_tokens
            .mark_used(token)
            .await
            .map_err(store_error)
    }
}

/// Loader payloads stored in `loaders.file_data`.
#[derive(Clone)]
pub struct PgBlobStore {
    loaders: LoaderRepository,
}

impl PgBlobStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            loaders: LoaderRepository::new(pool),
        }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn fetch(&self, loader_id: Uuid) -> StoreResult<Option<Vec<u8>>> {
        self.loaders
            .fetch_payload(loader_id)
            .await
            .map_err(store_error)
    }
}

/// Appends activity entries to the `activity_log` table. Entries that cannot
/// be stored are emitted through tracing instead.
#[derive(Clone)]
pub struct PgActivityLog {
    repo: ActivityLogRepository,
}

impl PgActivityLog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: ActivityLogRepository::new(pool),
        }
    }
}

#[async_trait]
impl ActivityLog for PgActivityLog {
    async fn record(&self, entry: ActivityEntry) {
        if let Err(e) = self.repo.append(&entry).await {
            tracing::warn!(
                error = %e,
                action = %entry.action,
                "Failed to append activity log entry, writing it to the log stream"
            );
            TracingActivityLog.record(entry).await;
        }
    }
}
