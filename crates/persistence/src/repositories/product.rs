//! Product repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ProductEntity;
use crate::metrics::QueryTimer;

/// Repository for product-related database operations.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find product by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_product_by_id");
        let result = sqlx::query_as::<_, ProductEntity>(
            r#"
            SELECT id, name, display_name, is_frozen, download_count, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn increment_download_count(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("increment_product_download_count");
        let result = sqlx::query(
            r#"
            UPDATE products
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
