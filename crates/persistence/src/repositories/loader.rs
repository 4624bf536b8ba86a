//! Loader repository for database operations.
//!
//! Row lookups never select `file_data`; the payload is read only when a
//! download is actually released.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::LoaderEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct LoaderRepository {
    pool: PgPool,
}

impl LoaderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recently updated active loader with the given name.
    pub async fn find_active_by_name(
        &self,
        cheat_name: &str,
    ) -> Result<Option<LoaderEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_loader_by_name");
        let result = sqlx::query_as::<_, LoaderEntity>(
            r#"
            SELECT id, product_id, cheat_name, filename, file_size, is_active,
                   (file_data IS NOT NULL) AS has_payload, download_count, updated_at
            FROM loaders
            WHERE cheat_name = $1 AND is_active = TRUE
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(cheat_name)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LoaderEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_loader_by_id");
        let result = sqlx::query_as::<_, LoaderEntity>(
            r#"
            SELECT id, product_id, cheat_name, filename, file_size, is_active,
                   (file_data IS NOT NULL) AS has_payload, download_count, updated_at
            FROM loaders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Loads the binary payload. `None` when the loader or its data is absent.
    pub async fn fetch_payload(&self, id: Uuid) -> Result<Option<Vec<u8>>, sqlx::Error> {
        let timer = QueryTimer::new("fetch_loader_payload");
        let result = sqlx::query_scalar::<_, Option<Vec<u8>>>(
            r#"
            SELECT file_data
            FROM loaders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(Option::flatten)
    }

    pub async fn increment_download_count(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("increment_loader_download_count");
        let result = sqlx::query(
            r#"
            UPDATE loaders
            SET download_count = download_count + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }
}
