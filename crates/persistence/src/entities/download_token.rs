//! Download token entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the download_tokens table.
#[derive(Debug, Clone, FromRow)]
pub struct DownloadTokenEntity {
    pub token: String,
    pub user_id: Uuid,
    pub loader_id: Uuid,
    pub cheat_name: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DownloadTokenEntity> for domain::models::DownloadToken {
    fn from(entity: DownloadTokenEntity) -> Self {
        Self {
            token: entity.token,
            user_id: entity.user_id,
            loader_id: entity.loader_id,
            cheat_name: entity.cheat_name,
            expires_at: entity.expires_at,
            used_at: entity.used_at,
            ip_address: entity.ip_address,
            user_agent: entity.user_agent,
            created_at: entity.created_at,
        }
    }
}
