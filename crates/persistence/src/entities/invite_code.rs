//! Invite code entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct InviteCodeEntity {
    pub code: String,
    pub created_by: Uuid,
    pub used_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<InviteCodeEntity> for domain::models::InviteCode {
    fn from(entity: InviteCodeEntity) -> Self {
        Self {
            code: entity.code,
            created_by: entity.created_by,
            used_by: entity.used_by,
            used_at: entity.used_at,
            created_at: entity.created_at,
        }
    }
}
