//! Hardware-id reset cooldown.

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use super::activity::ActivityLog;
use crate::error::{EntitlementError, EntitlementResult};
use crate::models::{ActivityCategory, ActivityEntry, HwidStatus, UserAccount};
use crate::store::EntitlementStore;

#[derive(Clone)]
pub struct HwidResetThrottle {
    store: Arc<dyn EntitlementStore>,
    activity: Arc<dyn ActivityLog>,
    cooldown: Duration,
}

impl HwidResetThrottle {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        activity: Arc<dyn ActivityLog>,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            activity,
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub async fn status(&self, user_id: Uuid) -> EntitlementResult<HwidStatus> {
        let now = self.store.now().await?;
        let user = self.require_user(user_id).await?;
        Ok(HwidStatus::evaluate(&user, now, self.cooldown))
    }

    /// Self-service reset, at most once per cooldown window.
    ///
    /// The cooldown is checked again by the conditional update itself, so two
    /// simultaneous requests cannot both get through.
    pub async fn self_reset(&self, user_id: Uuid) -> EntitlementResult<()> {
        let now = self.store.now().await?;
        let user = self.require_user(user_id).await?;

        if !user.can_reset_hwid(now, self.cooldown) {
            return Err(self.throttled(&user));
        }

        let affected = self.store.reset_hwid(user_id, Some(self.cooldown)).await?;
        if affected == 0 {
            let current = self.require_user(user_id).await?;
            return Err(self.throttled(&current));
        }

        tracing::info!(
            user_id = %user_id,
            reset_count = user.hwid_reset_count + 1,
            "HWID reset"
        );
        self.activity
            .record(
                ActivityEntry::new(ActivityCategory::Account, "hwid.reset")
                    .by(user_id)
                    .on(format!("user:{}", user_id))
                    .with_details(json!({
                        "reset_count": user.hwid_reset_count + 1,
                        "was_bound": user.hwid.is_some(),
                    })),
            )
            .await;

        Ok(())
    }

    /// Administrative reset. Ignores the cooldown.
    pub async fn force_reset(&self, user_id: Uuid, admin_id: Uuid) -> EntitlementResult<()> {
        let affected = self.store.reset_hwid(user_id, None).await?;
        if affected == 0 {
            return Err(EntitlementError::not_found("User"));
        }

        tracing::info!(user_id = %user_id, admin_id = %admin_id, "HWID force reset");
        self.activity
            .record(
                ActivityEntry::new(ActivityCategory::Account, "hwid.force_reset")
                    .by(admin_id)
                    .on(format!("user:{}", user_id)),
            )
            .await;

        Ok(())
    }

    async fn require_user(&self, user_id: Uuid) -> EntitlementResult<UserAccount> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| EntitlementError::not_found("User"))
    }

    fn throttled(&self, user: &UserAccount) -> EntitlementError {
        match user.cooldown_ends_at(self.cooldown) {
            Some(next_eligible_at) => {
                tracing::debug!(
                    user_id = %user.id,
                    next_eligible_at = %next_eligible_at,
                    "HWID reset throttled"
                );
                EntitlementError::Throttled { next_eligible_at }
            }
            None => EntitlementError::Storage("HWID reset could not be applied".to_string()),
        }
    }
}
