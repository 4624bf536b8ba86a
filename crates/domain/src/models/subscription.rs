//! Subscription domain model and window policies.
//!
//! There is at most one subscription row per (user, product). It is updated
//! in place on every grant, extension, revocation or reactivation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Active and not yet past its end date.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date > now
    }
}

/// Active subscription joined with its product, as listed to the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubscriptionSummary {
    pub product_id: Uuid,
    pub product_name: String,
    pub display_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Values written back for a (user, product) row.
#[derive(Debug, Clone)]
pub struct SubscriptionWrite {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

/// The date range a policy produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionWindow {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl SubscriptionWindow {
    pub fn into_write(self, user_id: Uuid, product_id: Uuid, now: DateTime<Utc>) -> SubscriptionWrite {
        SubscriptionWrite {
            user_id,
            product_id,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: true,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Days added onto the existing end date; start date unchanged.
    Extended,
    /// Stale or missing window replaced by one starting now.
    FreshStart,
}

/// Which rule decides between extension and fresh start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// Key activation and admin grants: extend only a current window
    /// (`is_active && end_date > now`).
    Merge,
    /// Admin extension: extend any row flagged active, even one whose end
    /// date has already passed.
    AdminExtend,
}

impl WindowPolicy {
    pub fn apply(
        self,
        existing: Option<&Subscription>,
        now: DateTime<Utc>,
        days: i32,
    ) -> (SubscriptionWindow, MergeOutcome) {
        let extends = match (self, existing) {
            (WindowPolicy::Merge, Some(sub)) => sub.is_current(now),
            (WindowPolicy::AdminExtend, Some(sub)) => sub.is_active,
            (_, None) => false,
        };
        let span = Duration::days(i64::from(days));

        match existing {
            Some(sub) if extends => (
                SubscriptionWindow {
                    start_date: sub.start_date,
                    end_date: sub.end_date + span,
                },
                MergeOutcome::Extended,
            ),
            _ => (
                SubscriptionWindow {
                    start_date: now,
                    end_date: now + span,
                },
                MergeOutcome::FreshStart,
            ),
        }
    }
}

/// Request to grant or extend a subscription on behalf of a user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct AdjustSubscriptionRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 3650, message = "days must be between 1 and 3650"))]
    pub days: i32,
}

/// Request to revoke a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RevokeSubscriptionRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
}
