//! License key repository for database operations.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::LicenseKeyEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct LicenseKeyRepository {
    pool: PgPool,
}

impl LicenseKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new unused key. Fails with a unique violation on code collision.
    pub async fn create(
        &self,
        code: &str,
        product_id: Uuid,
        duration_days: i32,
        created_by: Uuid,
    ) -> Result<LicenseKeyEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_license_key");
        let result = sqlx::query_as::<_, LicenseKeyEntity>(
            r#"
            INSERT INTO license_keys (code, product_id, duration_days, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, product_id, duration_days, is_used, used_by, used_at, created_by, created_at
            "#,
        )
        .bind(code)
        .bind(product_id)
        .bind(duration_days)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<LicenseKeyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_license_key_by_code");
        let result = sqlx::query_as::<_, LicenseKeyEntity>(
            r#"
            SELECT id, code, product_id, duration_days, is_used, used_by, used_at, created_by, created_at
            FROM license_keys
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Marks the key used iff it is still unused. Returns rows affected.
    pub async fn mark_used(
        conn: &mut PgConnection,
        id: Uuid,
        used_by: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("mark_license_key_used");
        let result = sqlx::query(
            r#"
            UPDATE license_keys
            SET is_used = TRUE, used_by = $2, used_at = NOW()
            WHERE id = $1 AND is_used = FALSE
            "#,
        )
        .bind(id)
        .bind(used_by)
        .execute(conn)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }
}
