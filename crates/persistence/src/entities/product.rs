//! Product entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the products table.
#[derive(Debug, Clone, FromRow)]
pub struct ProductEntity {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub is_frozen: bool,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ProductEntity> for domain::models::Product {
    fn from(entity: ProductEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            display_name: entity.display_name,
            is_frozen: entity.is_frozen,
            download_count: entity.download_count,
            created_at: entity.created_at,
        }
    }
}
