//! Per-(user, product) subscription windows.
//!
//! There is at most one row per pair. It is created on first entitlement and
//! then updated in place by activations, grants, extensions and revocations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use super::activity::ActivityLog;
use super::{abandon, check};
use crate::error::{EntitlementError, EntitlementResult};
use crate::models::{
    ActivityCategory, ActivityEntry, MergeOutcome, Subscription, SubscriptionSummary,
    WindowPolicy,
};
use crate::store::{EntitlementStore, StoreTransaction};
use shared::validation::validate_duration_days;

/// A window written inside a transaction, with how it was derived.
#[derive(Debug, Clone)]
pub struct AppliedWindow {
    pub subscription: Subscription,
    pub outcome: MergeOutcome,
    pub applied_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SubscriptionLedger {
    store: Arc<dyn EntitlementStore>,
    activity: Arc<dyn ActivityLog>,
}

impl SubscriptionLedger {
    pub fn new(store: Arc<dyn EntitlementStore>, activity: Arc<dyn ActivityLog>) -> Self {
        Self { store, activity }
    }

    /// Current windows (`is_active` and not yet ended), soonest end first.
    pub async fn list_active(&self, user_id: Uuid) -> EntitlementResult<Vec<SubscriptionSummary>> {
        Ok(self.store.list_active_subscriptions(user_id).await?)
    }

    /// Administrative grant using the activation merge rule.
    pub async fn grant(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        days: i32,
        granted_by: Uuid,
    ) -> EntitlementResult<Subscription> {
        self.adjust(
            user_id,
            product_id,
            days,
            granted_by,
            WindowPolicy::Merge,
            "subscription.granted",
        )
        .await
    }

    /// Administrative extension: adds days to any row flagged active, even
    /// one whose end date has passed.
    pub async fn extend(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        days: i32,
        extended_by: Uuid,
    ) -> EntitlementResult<Subscription> {
        self.adjust(
            user_id,
            product_id,
            days,
            extended_by,
            WindowPolicy::AdminExtend,
            "subscription.extended",
        )
        .await
    }

    /// Clears the active flag. The end date is kept as history.
    pub async fn revoke(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        revoked_by: Uuid,
    ) -> EntitlementResult<()> {
        let affected = self
            .store
            .deactivate_subscription(user_id, product_id)
            .await?;
        if affected == 0 {
            return Err(EntitlementError::not_found("Subscription"));
        }

        tracing::info!(
            user_id = %user_id,
            product_id = %product_id,
            revoked_by = %revoked_by,
            "Subscription revoked"
        );
        self.activity
            .record(
                ActivityEntry::new(ActivityCategory::Entitlement, "subscription.revoked")
                    .by(revoked_by)
                    .on(format!("user:{}", user_id))
                    .with_details(json!({ "product_id": product_id })),
            )
            .await;

        Ok(())
    }

    /// Reads, merges and writes the (user, product) window inside `tx`.
    ///
    /// The row is locked first so concurrent merges on the same pair apply
    /// one after the other.
    pub async fn apply_within(
        &self,
        tx: &mut dyn StoreTransaction,
        user_id: Uuid,
        product_id: Uuid,
        days: i32,
        policy: WindowPolicy,
    ) -> EntitlementResult<AppliedWindow> {
        let now = tx.now().await?;
        let existing = tx.lock_subscription(user_id, product_id).await?;

        if let (WindowPolicy::AdminExtend, Some(sub)) = (policy, existing.as_ref()) {
            if sub.is_active && sub.end_date <= now {
                // Admin extend does not check expiry.
                tracing::warn!(
                    user_id = %user_id,
                    product_id = %product_id,
                    end_date = %sub.end_date,
                    "Extending a subscription that is flagged active but already ended"
                );
            }
        }

        let (window, outcome) = policy.apply(existing.as_ref(), now, days);
        let subscription = tx
            .save_subscription(&window.into_write(user_id, product_id, now))
            .await?;

        Ok(AppliedWindow {
            subscription,
            outcome,
            applied_at: now,
        })
    }

    async fn adjust(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        days: i32,
        actor: Uuid,
        policy: WindowPolicy,
        action: &'static str,
    ) -> EntitlementResult<Subscription> {
        check(validate_duration_days(days))?;

        if self.store.find_product(product_id).await?.is_none() {
            return Err(EntitlementError::not_found("Product"));
        }
        if self.store.find_user(user_id).await?.is_none() {
            return Err(EntitlementError::not_found("User"));
        }

        let mut tx = self.store.begin().await?;
        let merged = self
            .apply_within(tx.as_mut(), user_id, product_id, days, policy)
            .await;
        let applied = match merged {
            Ok(applied) => applied,
            Err(err) => {
                abandon(tx, action).await;
                return Err(err);
            }
        };
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            product_id = %product_id,
            days,
            outcome = ?applied.outcome,
            end_date = %applied.subscription.end_date,
            actor = %actor,
            "{}",
            action
        );
        self.activity
            .record(
                ActivityEntry::new(ActivityCategory::Entitlement, action)
                    .by(actor)
                    .on(format!("user:{}", user_id))
                    .with_details(json!({
                        "product_id": product_id,
                        "days": days,
                        "outcome": applied.outcome,
                        "end_date": applied.subscription.end_date,
                    })),
            )
            .await;

        Ok(applied.subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionWrite;
    use crate::services::RecordingActivityLog;
    use crate::store::InMemoryStore;
    use chrono::Duration;

    struct Fixture {
        store: InMemoryStore,
        ledger: SubscriptionLedger,
        activity: Arc<RecordingActivityLog>,
        user_id: Uuid,
        product_id: Uuid,
        admin_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let activity = Arc::new(RecordingActivityLog::new());
        let ledger = SubscriptionLedger::new(Arc::new(store.clone()), activity.clone());
        let user = store.add_user("alice").await;
        let product = store.add_product("fatality", "Fatality").await;
        Fixture {
            store,
            ledger,
            activity,
            user_id: user.id,
            product_id: product.id,
            admin_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_grant_creates_fresh_window() {
        let f = fixture().await;
        let now = f.store.clock_now();

        let sub = f
            .ledger
            .grant(f.user_id, f.product_id, 30, f.admin_id)
            .await
            .unwrap();

        assert!(sub.is_active);
        assert_eq!(sub.start_date, now);
        assert_eq!(sub.end_date, now + Duration::days(30));
        assert_eq!(f.activity.actions("subscription.granted").len(), 1);
    }

    #[tokio::test]
    async fn test_grant_extends_current_window() {
        let f = fixture().await;
        let first = f
            .ledger
            .grant(f.user_id, f.product_id, 30, f.admin_id)
            .await
            .unwrap();
        f.store.advance_clock(Duration::days(5));

        let second = f
            .ledger
            .grant(f.user_id, f.product_id, 10, f.admin_id)
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.start_date, first.start_date);
        assert_eq!(second.end_date, first.end_date + Duration::days(10));
    }

    #[tokio::test]
    async fn test_grant_after_expiry_starts_fresh() {
        let f = fixture().await;
        f.ledger
            .grant(f.user_id, f.product_id, 30, f.admin_id)
            .await
            .unwrap();
        f.store.advance_clock(Duration::days(31));
        let now = f.store.clock_now();

        let sub = f
            .ledger
            .grant(f.user_id, f.product_id, 7, f.admin_id)
            .await
            .unwrap();

        assert_eq!(sub.start_date, now);
        assert_eq!(sub.end_date, now + Duration::days(7));
    }

    #[tokio::test]
    async fn test_extend_adds_onto_ended_window_still_flagged_active() {
        let f = fixture().await;
        let now = f.store.clock_now();
        let stale_end = now - Duration::days(3);
        f.store
            .put_subscription(SubscriptionWrite {
                user_id: f.user_id,
                product_id: f.product_id,
                start_date: now - Duration::days(33),
                end_date: stale_end,
                is_active: true,
                updated_at: now - Duration::days(33),
            })
            .await;

        let sub = f
            .ledger
            .extend(f.user_id, f.product_id, 10, f.admin_id)
            .await
            .unwrap();

        assert_eq!(sub.end_date, stale_end + Duration::days(10));
    }

    #[tokio::test]
    async fn test_extend_inactive_row_starts_fresh() {
        let f = fixture().await;
        f.ledger
            .grant(f.user_id, f.product_id, 30, f.admin_id)
            .await
            .unwrap();
        f.ledger
            .revoke(f.user_id, f.product_id, f.admin_id)
            .await
            .unwrap();
        let now = f.store.clock_now();

        let sub = f
            .ledger
            .extend(f.user_id, f.product_id, 10, f.admin_id)
            .await
            .unwrap();

        assert!(sub.is_active);
        assert_eq!(sub.start_date, now);
        assert_eq!(sub.end_date, now + Duration::days(10));
    }

    #[tokio::test]
    async fn test_revoke_keeps_end_date() {
        let f = fixture().await;
        let granted = f
            .ledger
            .grant(f.user_id, f.product_id, 30, f.admin_id)
            .await
            .unwrap();

        f.ledger
            .revoke(f.user_id, f.product_id, f.admin_id)
            .await
            .unwrap();

        let row = f
            .store
            .find_subscription(f.user_id, f.product_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!row.is_active);
        assert_eq!(row.end_date, granted.end_date);
        assert!(f.ledger.list_active(f.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_missing_subscription() {
        let f = fixture().await;
        let err = f
            .ledger
            .revoke(f.user_id, f.product_id, f.admin_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EntitlementError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_days_out_of_range() {
        let f = fixture().await;
        for days in [0, -1, 3651] {
            let err = f
                .ledger
                .grant(f.user_id, f.product_id, days, f.admin_id)
                .await
                .unwrap_err();
            assert!(matches!(err, EntitlementError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_unknown_product_and_user() {
        let f = fixture().await;
        let err = f
            .ledger
            .grant(f.user_id, Uuid::new_v4(), 30, f.admin_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EntitlementError::NotFound(_)));

        let err = f
            .ledger
            .grant(Uuid::new_v4(), f.product_id, 30, f.admin_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EntitlementError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_row() {
        let f = fixture().await;
        f.store.fail_subscription_writes(true);

        let err = f
            .ledger
            .grant(f.user_id, f.product_id, 30, f.admin_id)
            .await
            .unwrap_err();

        assert!(matches!(err, EntitlementError::Storage(_)));
        assert!(f
            .store
            .find_subscription(f.user_id, f.product_id)
            .await
            .unwrap()
            .is_none());
        assert!(f.activity.entries().is_empty());
    }

    #[tokio::test]
    async fn test_list_active_orders_by_end_date() {
        let f = fixture().await;
        let other = f.store.add_product("onetap", "Onetap").await;
        f.ledger
            .grant(f.user_id, f.product_id, 60, f.admin_id)
            .await
            .unwrap();
        f.ledger
            .grant(f.user_id, other.id, 10, f.admin_id)
            .await
            .unwrap();

        let active = f.ledger.list_active(f.user_id).await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].product_name, "onetap");
        assert_eq!(active[1].display_name, "Fatality");
    }
}
