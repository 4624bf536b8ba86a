//! Subscription repository for database operations.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{SubscriptionEntity, SubscriptionWithProductEntity};
use crate::metrics::QueryTimer;
use domain::models::SubscriptionWrite;

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_subscription");
        let result = sqlx::query_as::<_, SubscriptionEntity>(
            r#"
            SELECT id, user_id, product_id, start_date, end_date, is_active, updated_at
            FROM subscriptions
            WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Active, unexpired subscriptions with product names, soonest end first.
    pub async fn list_active(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SubscriptionWithProductEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_subscriptions");
        let result = sqlx::query_as::<_, SubscriptionWithProductEntity>(
            r#"
            SELECT s.product_id, p.name AS product_name, p.display_name,
                   s.start_date, s.end_date
            FROM subscriptions s
            JOIN products p ON p.id = s.product_id
            WHERE s.user_id = $1
              AND s.is_active = TRUE
              AND s.end_date > NOW()
            ORDER BY s.end_date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn deactivate(&self, user_id: Uuid, product_id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_subscription");
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET is_active = FALSE, updated_at = NOW()
            WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }

    /// Takes a transaction-scoped advisory lock on the pair, then reads the
    /// row. The advisory lock also covers the case where no row exists yet,
    /// which `FOR UPDATE` alone cannot.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_subscription");
        let lock_key = format!("subscription:{}:{}", user_id, product_id);

        let locked = sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(&lock_key)
            .execute(&mut *conn)
            .await;
        if let Err(err) = locked {
            timer.record();
            return Err(err);
        }

        let result = sqlx::query_as::<_, SubscriptionEntity>(
            r#"
            SELECT id, user_id, product_id, start_date, end_date, is_active, updated_at
            FROM subscriptions
            WHERE user_id = $1 AND product_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn upsert(
        conn: &mut PgConnection,
        input: &SubscriptionWrite,
    ) -> Result<SubscriptionEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_subscription");
        let result = sqlx::query_as::<_, SubscriptionEntity>(
            r#"
            INSERT INTO subscriptions (user_id, product_id, start_date, end_date, is_active, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, product_id, start_date, end_date, is_active, updated_at
            "#,
        )
        .bind(input.user_id)
        .bind(input.product_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.is_active)
        .bind(input.updated_at)
        .fetch_one(conn)
        .await;
        timer.record();
        result
    }
}
