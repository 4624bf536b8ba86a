//! In-memory implementation of the storage ports.
//!
//! Mirrors the conditional-update and transaction semantics of the
//! PostgreSQL store closely enough to exercise the services without a
//! database. Its clock is frozen and only moves through
//! [`InMemoryStore::advance_clock`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{BlobStore, EntitlementStore, StoreError, StoreResult, StoreTransaction};
use crate::models::{
    DownloadToken, InviteCode, LicenseKey, Loader, NewDownloadToken, NewLicenseKey, Product,
    Subscription, SubscriptionSummary, SubscriptionWrite, UserAccount,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    loaders: HashMap<Uuid, Loader>,
    blobs: HashMap<Uuid, Vec<u8>>,
    users: HashMap<Uuid, UserAccount>,
    license_keys: HashMap<Uuid, LicenseKey>,
    subscriptions: HashMap<(Uuid, Uuid), Subscription>,
    invite_codes: HashMap<String, InviteCode>,
    download_tokens: HashMap<String, DownloadToken>,
}

type SharedClock = Arc<StdMutex<DateTime<Utc>>>;

fn read_clock(clock: &SharedClock) -> DateTime<Utc> {
    *clock.lock().unwrap_or_else(PoisonError::into_inner)
}

fn upsert_subscription(state: &mut MemoryState, write: &SubscriptionWrite) -> Subscription {
    let row = state
        .subscriptions
        .entry((write.user_id, write.product_id))
        .or_insert_with(|| Subscription {
            id: Uuid::new_v4(),
            user_id: write.user_id,
            product_id: write.product_id,
            start_date: write.start_date,
            end_date: write.end_date,
            is_active: write.is_active,
            updated_at: write.updated_at,
        });
    row.start_date = write.start_date;
    row.end_date = write.end_date;
    row.is_active = write.is_active;
    row.updated_at = write.updated_at;
    row.clone()
}

/// Shared in-memory store. Clones share state.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    clock: SharedClock,
    fail_subscription_writes: Arc<AtomicBool>,
    interleave_lookups: Arc<AtomicBool>,
    missed_conditional_writes: Arc<AtomicU64>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock: Arc::new(StdMutex::new(Utc::now())),
            fail_subscription_writes: Arc::new(AtomicBool::new(false)),
            interleave_lookups: Arc::new(AtomicBool::new(false)),
            missed_conditional_writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current value of the frozen clock.
    pub fn clock_now(&self) -> DateTime<Utc> {
        read_clock(&self.clock)
    }

    pub fn advance_clock(&self, by: Duration) {
        let mut now = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Makes every subscription write inside a transaction fail, to exercise
    /// rollback paths.
    #[cfg(any(test, feature = "test-support"))]
    pub fn fail_subscription_writes(&self, fail: bool) {
        self.fail_subscription_writes.store(fail, Ordering::SeqCst);
    }

    /// Yields to the scheduler after each license-key and download-token
    /// lookup, so concurrent callers all read before any of them writes.
    #[cfg(any(test, feature = "test-support"))]
    pub fn interleave_lookups(&self, enabled: bool) {
        self.interleave_lookups.store(enabled, Ordering::SeqCst);
    }

    /// Conditional key, token and invite writes that matched no row.
    #[cfg(any(test, feature = "test-support"))]
    pub fn missed_conditional_writes(&self) -> u64 {
        self.missed_conditional_writes.load(Ordering::SeqCst)
    }

    async fn after_lookup(&self) {
        if self.interleave_lookups.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    fn missed_write(&self) -> StoreResult<u64> {
        self.missed_conditional_writes.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }

    pub async fn add_product(&self, name: &str, display_name: &str) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            is_frozen: false,
            download_count: 0,
            created_at: self.clock_now(),
        };
        self.state
            .lock()
            .await
            .products
            .insert(product.id, product.clone());
        product
    }

    pub async fn set_product_frozen(&self, product_id: Uuid, frozen: bool) {
        if let Some(product) = self.state.lock().await.products.get_mut(&product_id) {
            product.is_frozen = frozen;
        }
    }

    pub async fn add_user(&self, username: &str) -> UserAccount {
        let user = UserAccount {
            id: Uuid::new_v4(),
            username: username.to_string(),
            hwid: Some(format!("HWID-{}", Uuid::new_v4().simple())),
            hwid_reset_count: 0,
            last_hwid_reset: None,
        };
        self.state.lock().await.users.insert(user.id, user.clone());
        user
    }

    /// Registers a loader; `payload: None` models a loader row whose binary
    /// was never uploaded.
    pub async fn add_loader(
        &self,
        product_id: Uuid,
        cheat_name: &str,
        filename: &str,
        payload: Option<Vec<u8>>,
    ) -> Loader {
        let loader = Loader {
            id: Uuid::new_v4(),
            product_id,
            cheat_name: cheat_name.to_string(),
            filename: filename.to_string(),
            file_size: payload.as_ref().map(|p| p.len() as i64).unwrap_or(0),
            is_active: true,
            has_payload: payload.is_some(),
            download_count: 0,
            updated_at: self.clock_now(),
        };

        let mut state = self.state.lock().await;
        if let Some(bytes) = payload {
            state.blobs.insert(loader.id, bytes);
        }
        state.loaders.insert(loader.id, loader.clone());
        loader
    }

    pub async fn set_loader_active(&self, loader_id: Uuid, active: bool) {
        if let Some(loader) = self.state.lock().await.loaders.get_mut(&loader_id) {
            loader.is_active = active;
        }
    }

    /// Removes the stored bytes while leaving the loader flagged as having a
    /// payload, as happens when blob storage loses an object.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn drop_blob(&self, loader_id: Uuid) {
        self.state.lock().await.blobs.remove(&loader_id);
    }

    /// Writes a subscription row directly, bypassing the services.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn put_subscription(&self, write: SubscriptionWrite) -> Subscription {
        upsert_subscription(&mut *self.state.lock().await, &write)
    }

    pub async fn download_tokens_for(&self, user_id: Uuid, loader_id: Uuid) -> Vec<DownloadToken> {
        self.state
            .lock()
            .await
            .download_tokens
            .values()
            .filter(|t| t.user_id == user_id && t.loader_id == loader_id)
            .cloned()
            .collect()
    }

    pub async fn download_token_count(&self) -> usize {
        self.state.lock().await.download_tokens.len()
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    /// State to restore unless the transaction commits.
    snapshot: Option<MemoryState>,
    clock: SharedClock,
    fail_subscription_writes: bool,
    missed_conditional_writes: Arc<AtomicU64>,
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn now(&mut self) -> StoreResult<DateTime<Utc>> {
        Ok(read_clock(&self.clock))
    }

    async fn mark_license_key_used(&mut self, key_id: Uuid, user_id: Uuid) -> StoreResult<u64> {
        let now = read_clock(&self.clock);
        match self.guard.license_keys.get_mut(&key_id) {
            Some(key) if !key.is_used => {
                key.is_used = true;
                key.used_by = Some(user_id);
                key.used_at = Some(now);
                Ok(1)
            }
            _ => {
                self.missed_conditional_writes.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            }
        }
    }

    async fn lock_subscription(
        &mut self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<Option<Subscription>> {
        Ok(self.guard.subscriptions.get(&(user_id, product_id)).cloned())
    }

    async fn save_subscription(&mut self, write: &SubscriptionWrite) -> StoreResult<Subscription> {
        if self.fail_subscription_writes {
            return Err(StoreError::Unavailable(
                "simulated subscription write failure".to_string(),
            ));
        }
        Ok(upsert_subscription(&mut self.guard, write))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        tx.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl EntitlementStore for InMemoryStore {
    async fn now(&self) -> StoreResult<DateTime<Utc>> {
        Ok(self.clock_now())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            snapshot: Some(snapshot),
            clock: Arc::clone(&self.clock),
            fail_subscription_writes: self.fail_subscription_writes.load(Ordering::SeqCst),
            missed_conditional_writes: Arc::clone(&self.missed_conditional_writes),
        }))
    }

    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(&product_id).cloned())
    }

    async fn find_active_loader(&self, cheat_name: &str) -> StoreResult<Option<Loader>> {
        Ok(self
            .state
            .lock()
            .await
            .loaders
            .values()
            .filter(|l| l.is_active && l.cheat_name == cheat_name)
            .max_by_key(|l| l.updated_at)
            .cloned())
    }

    async fn find_loader(&self, loader_id: Uuid) -> StoreResult<Option<Loader>> {
        Ok(self.state.lock().await.loaders.get(&loader_id).cloned())
    }

    async fn increment_download_counters(
        &self,
        loader_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let Some(loader) = state.loaders.get_mut(&loader_id) {
            loader.download_count += 1;
        }
        if let Some(product) = state.products.get_mut(&product_id) {
            product.download_count += 1;
        }
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserAccount>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn reset_hwid(&self, user_id: Uuid, cooldown: Option<Duration>) -> StoreResult<u64> {
        let now = self.clock_now();
        let mut state = self.state.lock().await;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(0);
        };

        if let Some(cooldown) = cooldown {
            if !user.can_reset_hwid(now, cooldown) {
                return Ok(0);
            }
        }

        user.hwid = None;
        user.hwid_reset_count += 1;
        user.last_hwid_reset = Some(now);
        Ok(1)
    }

    async fn insert_license_key(&self, key: &NewLicenseKey) -> StoreResult<LicenseKey> {
        let now = self.clock_now();
        let mut state = self.state.lock().await;
        if state.license_keys.values().any(|k| k.code == key.code) {
            return Err(StoreError::Duplicate(
                "license_keys_code_key".to_string(),
            ));
        }

        let row = LicenseKey {
            id: Uuid::new_v4(),
            code: key.code.clone(),
            product_id: key.product_id,
            duration_days: key.duration_days,
            is_used: false,
            used_by: None,
            used_at: None,
            created_by: key.created_by,
            created_at: now,
        };
        state.license_keys.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_license_key(&self, code: &str) -> StoreResult<Option<LicenseKey>> {
        let key = self
            .state
            .lock()
            .await
            .license_keys
            .values()
            .find(|k| k.code == code)
            .cloned();
        self.after_lookup().await;
        Ok(key)
    }

    async fn find_subscription(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> StoreResult<Option<Subscription>> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .get(&(user_id, product_id))
            .cloned())
    }

    async fn list_active_subscriptions(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<SubscriptionSummary>> {
        let now = self.clock_now();
        let state = self.state.lock().await;

        let mut rows: Vec<SubscriptionSummary> = state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id && s.is_current(now))
            .filter_map(|s| {
                state.products.get(&s.product_id).map(|p| SubscriptionSummary {
                    product_id: p.id,
                    product_name: p.name.clone(),
                    display_name: p.display_name.clone(),
                    start_date: s.start_date,
                    end_date: s.end_date,
                })
            })
            .collect();
        rows.sort_by_key(|s| s.end_date);
        Ok(rows)
    }

    async fn deactivate_subscription(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<u64> {
        let now = self.clock_now();
        let mut state = self.state.lock().await;
        match state.subscriptions.get_mut(&(user_id, product_id)) {
            Some(sub) => {
                sub.is_active = false;
                sub.updated_at = now;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert_invite_code(&self, code: &str, created_by: Uuid) -> StoreResult<InviteCode> {
        let now = self.clock_now();
        let mut state = self.state.lock().await;
        if state.invite_codes.contains_key(code) {
            return Err(StoreError::Duplicate("invite_codes_pkey".to_string()));
        }

        let row = InviteCode {
            code: code.to_string(),
            created_by,
            used_by: None,
            used_at: None,
            created_at: now,
        };
        state.invite_codes.insert(row.code.clone(), row.clone());
        Ok(row)
    }

    async fn find_invite_code(&self, code: &str) -> StoreResult<Option<InviteCode>> {
        Ok(self.state.lock().await.invite_codes.get(code).cloned())
    }

    async fn consume_invite_code(&self, code: &str, used_by: Uuid) -> StoreResult<u64> {
        let now = self.clock_now();
        let mut state = self.state.lock().await;
        match state.invite_codes.get_mut(code) {
            Some(invite) if invite.used_by.is_none() => {
                invite.used_by = Some(used_by);
                invite.used_at = Some(now);
                Ok(1)
            }
            _ => self.missed_write(),
        }
    }

    async fn delete_expired_download_tokens(&self) -> StoreResult<u64> {
        let now = self.clock_now();
        let mut state = self.state.lock().await;
        let before = state.download_tokens.len();
        state.download_tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - state.download_tokens.len()) as u64)
    }

    async fn find_live_download_token(
        &self,
        user_id: Uuid,
        loader_id: Uuid,
    ) -> StoreResult<Option<DownloadToken>> {
        let now = self.clock_now();
        Ok(self
            .state
            .lock()
            .await
            .download_tokens
            .values()
            .filter(|t| t.user_id == user_id && t.loader_id == loader_id && t.is_usable(now))
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn insert_download_token(
        &self,
        token: &NewDownloadToken,
        ttl: Duration,
    ) -> StoreResult<DownloadToken> {
        let now = self.clock_now();
        let mut state = self.state.lock().await;
        if state.download_tokens.contains_key(&token.token) {
            return Err(StoreError::Duplicate("download_tokens_pkey".to_string()));
        }

        let row = DownloadToken {
            token: token.token.clone(),
            user_id: token.user_id,
            loader_id: token.loader_id,
            cheat_name: token.cheat_name.clone(),
            expires_at: now + ttl,
            used_at: None,
            ip_address: token.ip_address.clone(),
            user_agent: token.user_agent.clone(),
            created_at: now,
        };
        state.download_tokens.insert(row.token.clone(), row.clone());
        Ok(row)
    }

    async fn find_usable_download_token(&self, token: &str) -> StoreResult<Option<DownloadToken>> {
        let now = self.clock_now();
        let row = self
            .state
            .lock()
            .await
            .download_tokens
            .get(token)
            .filter(|t| t.is_usable(now))
            .cloned();
        self.after_lookup().await;
        Ok(row)
    }

    async fn mark_download_token_used(&self, token: &str) -> StoreResult<u64> {
        let now = self.clock_now();
        let mut state = self.state.lock().await;
        match state.download_tokens.get_mut(token) {
            Some(row) if row.is_usable(now) => {
                row.used_at = Some(now);
                Ok(1)
            }
            _ => self.missed_write(),
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryStore {
    async fn fetch(&self, loader_id: Uuid) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.lock().await.blobs.get(&loader_id).cloned())
    }
}
