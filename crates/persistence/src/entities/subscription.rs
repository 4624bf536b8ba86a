//! Subscription entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the subscriptions table.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriptionEntity> for domain::models::Subscription {
    fn from(entity: SubscriptionEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            product_id: entity.product_id,
            start_date: entity.start_date,
            end_date: entity.end_date,
            is_active: entity.is_active,
            updated_at: entity.updated_at,
        }
    }
}

/// Subscription joined with its product, for listings.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionWithProductEntity {
    pub product_id: Uuid,
    pub product_name: String,
    pub display_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<SubscriptionWithProductEntity> for domain::models::SubscriptionSummary {
    fn from(entity: SubscriptionWithProductEntity) -> Self {
        Self {
            product_id: entity.product_id,
            product_name: entity.product_name,
            display_name: entity.display_name,
            start_date: entity.start_date,
            end_date: entity.end_date,
        }
    }
}
