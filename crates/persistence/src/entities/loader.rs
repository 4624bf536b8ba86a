//! Loader entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the loaders table, without the payload column.
#[derive(Debug, Clone, FromRow)]
pub struct LoaderEntity {
    pub id: Uuid,
    pub product_id: Uuid,
    pub cheat_name: String,
    pub filename: String,
    pub file_size: i64,
    pub is_active: bool,
    /// `file_data IS NOT NULL`
    pub has_payload: bool,
    pub download_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<LoaderEntity> for domain::models::Loader {
    fn from(entity: LoaderEntity) -> Self {
        Self {
            id: entity.id,
            product_id: entity.product_id,
            cheat_name: entity.cheat_name,
            filename: entity.filename,
            file_size: entity.file_size,
            is_active: entity.is_active,
            has_payload: entity.has_payload,
            download_count: entity.download_count,
            updated_at: entity.updated_at,
        }
    }
}
