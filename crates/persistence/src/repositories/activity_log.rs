//! Activity log repository (append only).

use sqlx::PgPool;

use crate::metrics::QueryTimer;
use domain::models::ActivityEntry;

#[derive(Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, entry: &ActivityEntry) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("append_activity_log");
        let result = sqlx::query(
            r#"
            INSERT INTO activity_log (actor_id, category, action, target, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.category.to_string())
        .bind(&entry.action)
        .bind(entry.target.as_deref())
        .bind(&entry.details)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
