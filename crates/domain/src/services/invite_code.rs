//! Registration invite codes.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::activity::ActivityLog;
use crate::error::{EntitlementError, EntitlementResult};
use crate::models::invite_code::{generate_invite_code, is_well_formed};
use crate::models::{ActivityCategory, ActivityEntry, InviteCode};
use crate::store::{EntitlementStore, StoreError};
use shared::validation::normalize_code;

#[derive(Clone)]
pub struct InviteCodeRegistry {
    store: Arc<dyn EntitlementStore>,
    activity: Arc<dyn ActivityLog>,
    batch_max: u32,
    attempts: u32,
}

impl InviteCodeRegistry {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        activity: Arc<dyn ActivityLog>,
        batch_max: u32,
        attempts: u32,
    ) -> Self {
        Self {
            store,
            activity,
            batch_max,
            attempts: attempts.max(1),
        }
    }

    /// Mints `count` unused codes.
    pub async fn generate(&self, count: u32, created_by: Uuid) -> EntitlementResult<Vec<InviteCode>> {
        if count == 0 || count > self.batch_max {
            return Err(EntitlementError::Validation(format!(
                "count must be between 1 and {}",
                self.batch_max
            )));
        }

        let mut codes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            codes.push(self.mint(created_by).await?);
        }

        tracing::info!(count, created_by = %created_by, "Invite codes created");
        self.activity
            .record(
                ActivityEntry::new(ActivityCategory::Account, "invite_codes.created")
                    .by(created_by)
                    .with_details(json!({ "count": count })),
            )
            .await;

        Ok(codes)
    }

    /// True iff the code exists and has not been consumed.
    pub async fn validate(&self, code: &str) -> EntitlementResult<bool> {
        let code = normalize_code(code);
        if !is_well_formed(&code) {
            return Ok(false);
        }

        Ok(self
            .store
            .find_invite_code(&code)
            .await?
            .map(|invite| invite.is_available())
            .unwrap_or(false))
    }

    /// Claims the code for `used_by`. Exactly one caller ever gets `true`.
    pub async fn consume(&self, code: &str, used_by: Uuid) -> EntitlementResult<bool> {
        let code = normalize_code(code);
        if !is_well_formed(&code) {
            return Ok(false);
        }

        let consumed = self.store.consume_invite_code(&code, used_by).await? == 1;
        if !consumed {
            tracing::debug!(used_by = %used_by, "Invite code unavailable");
            return Ok(false);
        }

        tracing::info!(used_by = %used_by, "Invite code consumed");
        self.activity
            .record(
                ActivityEntry::new(ActivityCategory::Account, "invite_code.consumed")
                    .by(used_by)
                    .on(format!("invite_code:{}", code)),
            )
            .await;

        Ok(true)
    }

    async fn mint(&self, created_by: Uuid) -> EntitlementResult<InviteCode> {
        for attempt in 1..=self.attempts {
            let candidate = generate_invite_code();
            match self.store.insert_invite_code(&candidate, created_by).await {
                Ok(invite) => return Ok(invite),
                Err(StoreError::Duplicate(_)) => {
                    tracing::debug!(attempt, "Invite code collision, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::error!(attempts = self.attempts, "Failed to generate a unique invite code");
        Err(EntitlementError::Storage(
            "Could not generate a unique invite code".to_string(),
        ))
    }
}
