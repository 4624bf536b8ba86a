//! License key minting and redemption.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::activity::ActivityLog;
use super::subscription_ledger::{AppliedWindow, SubscriptionLedger};
use super::{abandon, check};
use crate::error::{EntitlementError, EntitlementResult};
use crate::models::license_key::{generate_license_code, is_well_formed};
use crate::models::{
    ActivationResult, ActivityCategory, ActivityEntry, KeyRecord, LicenseKey, MergeOutcome,
    NewLicenseKey, Product, WindowPolicy,
};
use crate::store::{EntitlementStore, StoreError, StoreTransaction};
use shared::validation::{normalize_code, validate_duration_days};

/// Most keys minted by a single batch request.
pub const MAX_KEY_BATCH: u32 = 100;

#[derive(Clone)]
pub struct LicenseKeyService {
    store: Arc<dyn EntitlementStore>,
    ledger: SubscriptionLedger,
    activity: Arc<dyn ActivityLog>,
    attempts: u32,
}

impl LicenseKeyService {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        ledger: SubscriptionLedger,
        activity: Arc<dyn ActivityLog>,
        attempts: u32,
    ) -> Self {
        Self {
            store,
            ledger,
            activity,
            attempts: attempts.max(1),
        }
    }

    /// Mints one key for `product_id`.
    pub async fn generate(
        &self,
        product_id: Uuid,
        duration_days: i32,
        created_by: Uuid,
    ) -> EntitlementResult<KeyRecord> {
        let mut keys = self
            .generate_batch(product_id, duration_days, 1, created_by)
            .await?;
        keys.pop()
            .ok_or_else(|| EntitlementError::Storage("No license key was generated".to_string()))
    }

    /// Mints `count` keys for `product_id`, each with its own unique code.
    pub async fn generate_batch(
        &self,
        product_id: Uuid,
        duration_days: i32,
        count: u32,
        created_by: Uuid,
    ) -> EntitlementResult<Vec<KeyRecord>> {
        check(validate_duration_days(duration_days))?;
        if count == 0 || count > MAX_KEY_BATCH {
            return Err(EntitlementError::Validation(format!(
                "count must be between 1 and {}",
                MAX_KEY_BATCH
            )));
        }

        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| EntitlementError::not_found("Product"))?;

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = self.mint(&product, duration_days, created_by).await?;
            records.push(KeyRecord::new(key, &product));
        }

        tracing::info!(
            product_id = %product.id,
            duration_days,
            count,
            created_by = %created_by,
            "License keys generated"
        );
        self.activity
            .record(
                ActivityEntry::new(ActivityCategory::Entitlement, "license_key.generated")
                    .by(created_by)
                    .on(format!("product:{}", product.name))
                    .with_details(json!({
                        "count": count,
                        "duration_days": duration_days,
                        "key_ids": records.iter().map(|r| r.id).collect::<Vec<_>>(),
                    })),
            )
            .await;

        Ok(records)
    }

    /// Redeems a key for `user_id`.
    ///
    /// Marking the key and merging the subscription commit together or not
    /// at all. Of two callers racing on one key, the loser sees `AlreadyUsed`.
    pub async fn activate(&self, code: &str, user_id: Uuid) -> EntitlementResult<ActivationResult> {
        let code = normalize_code(code);
        if !is_well_formed(&code) {
            return Err(EntitlementError::Validation(
                "Invalid license key format".to_string(),
            ));
        }

        let key = self
            .store
            .find_license_key(&code)
            .await?
            .ok_or_else(|| EntitlementError::not_found("License key"))?;

        if key.is_used {
            return Err(EntitlementError::AlreadyUsed {
                used_by: key.used_by,
                used_at: key.used_at,
            });
        }

        let product = self
            .store
            .find_product(key.product_id)
            .await?
            .ok_or_else(|| EntitlementError::not_found("Product"))?;
        if product.is_frozen {
            return Err(EntitlementError::ProductFrozen(product.display_name));
        }

        if self.store.find_user(user_id).await?.is_none() {
            return Err(EntitlementError::not_found("User"));
        }

        let mut tx = self.store.begin().await?;
        let redeemed = self.redeem(tx.as_mut(), &key, user_id).await;
        let applied = match redeemed {
            Ok(applied) => applied,
            Err(EntitlementError::AlreadyUsed { .. }) => {
                abandon(tx, "license_key.activate").await;
                return Err(self.already_used(&code).await);
            }
            Err(err) => {
                tracing::warn!(
                    key_id = %key.id,
                    user_id = %user_id,
                    error = %err,
                    "License key activation rolled back"
                );
                abandon(tx, "license_key.activate").await;
                return Err(err);
            }
        };
        tx.commit().await?;

        let extended = applied.outcome == MergeOutcome::Extended;
        tracing::info!(
            key_id = %key.id,
            user_id = %user_id,
            product_id = %product.id,
            extended,
            end_date = %applied.subscription.end_date,
            "License key activated"
        );
        self.activity
            .record(
                ActivityEntry::new(ActivityCategory::Entitlement, "license_key.activated")
                    .by(user_id)
                    .on(format!("license_key:{}", key.id))
                    .with_details(json!({
                        "product_id": product.id,
                        "duration_days": key.duration_days,
                        "extended": extended,
                        "end_date": applied.subscription.end_date,
                    })),
            )
            .await;

        Ok(ActivationResult {
            product_name: product.name,
            display_name: product.display_name,
            duration_days: key.duration_days,
            start_date: applied.subscription.start_date,
            end_date: applied.subscription.end_date,
            extended,
        })
    }

    async fn redeem(
        &self,
        tx: &mut dyn StoreTransaction,
        key: &LicenseKey,
        user_id: Uuid,
    ) -> EntitlementResult<AppliedWindow> {
        let marked = tx.mark_license_key_used(key.id, user_id).await?;
        if marked == 0 {
            return Err(EntitlementError::AlreadyUsed {
                used_by: None,
                used_at: None,
            });
        }

        self.ledger
            .apply_within(
                tx,
                user_id,
                key.product_id,
                key.duration_days,
                WindowPolicy::Merge,
            )
            .await
    }

    /// Builds the race-loser error from whoever won.
    async fn already_used(&self, code: &str) -> EntitlementError {
        match self.store.find_license_key(code).await {
            Ok(Some(key)) => EntitlementError::AlreadyUsed {
                used_by: key.used_by,
                used_at: key.used_at,
            },
            Ok(None) => EntitlementError::not_found("License key"),
            Err(err) => err.into(),
        }
    }

    async fn mint(
        &self,
        product: &Product,
        duration_days: i32,
        created_by: Uuid,
    ) -> EntitlementResult<LicenseKey> {
        let prefix = product.key_prefix();

        for attempt in 1..=self.attempts {
            let candidate = NewLicenseKey {
                code: generate_license_code(&prefix),
                product_id: product.id,
                duration_days,
                created_by,
            };

            match self.store.insert_license_key(&candidate).await {
                Ok(key) => return Ok(key),
                Err(StoreError::Duplicate(_)) => {
                    tracing::debug!(attempt, "License key code collision, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::error!(
            product_id = %product.id,
            attempts = self.attempts,
            "Failed to generate a unique license key"
        );
        Err(EntitlementError::Storage(
            "Could not generate a unique license key".to_string(),
        ))
    }
}
