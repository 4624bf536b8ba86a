//! User entity (database row mapping). Only the columns this service reads.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct UserAccountEntity {
    pub id: Uuid,
    pub username: String,
    pub hwid: Option<String>,
    pub hwid_reset_count: i32,
    pub last_hwid_reset: Option<DateTime<Utc>>,
}

impl From<UserAccountEntity> for domain::models::UserAccount {
    fn from(entity: UserAccountEntity) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            hwid: entity.hwid,
            hwid_reset_count: entity.hwid_reset_count,
            last_hwid_reset: entity.last_hwid_reset,
        }
    }
}
