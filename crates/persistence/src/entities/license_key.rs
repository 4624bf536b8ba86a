//! License key entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the license_keys table.
#[derive(Debug, Clone, FromRow)]
pub struct LicenseKeyEntity {
    pub id: Uuid,
    pub code: String,
    pub product_id: Uuid,
    pub duration_days: i32,
    pub is_used: bool,
    pub used_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<LicenseKeyEntity> for domain::models::LicenseKey {
    fn from(entity: LicenseKeyEntity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            product_id: entity.product_id,
            duration_days: entity.duration_days,
            is_used: entity.is_used,
            used_by: entity.used_by,
            used_at: entity.used_at,
            created_by: entity.created_by,
            created_at: entity.created_at,
        }
    }
}
