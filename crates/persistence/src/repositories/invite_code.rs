//! Invite code repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::InviteCodeEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct InviteCodeRepository {
    pool: PgPool,
}

impl InviteCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, code: &str, created_by: Uuid) -> Result<InviteCodeEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_invite_code");
        let result = sqlx::query_as::<_, InviteCodeEntity>(
            r#"
            INSERT INTO invite_codes (code, created_by)
            VALUES ($1, $2)
            RETURNING code, created_by, used_by, used_at, created_at
            "#,
        )
        .bind(code)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_invite_code");
        let result = sqlx::query_as::<_, InviteCodeEntity>(
            r#"
            SELECT code, created_by, used_by, used_at, created_at
            FROM invite_codes
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Claims the code iff unclaimed. Returns rows affected.
    pub async fn consume(&self, code: &str, used_by: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("consume_invite_code");
        let result = sqlx::query(
            r#"
            UPDATE invite_codes
            SET used_by = $2, used_at = NOW()
            WHERE code = $1 AND used_by IS NULL
            "#,
        )
        .bind(code)
        .bind(used_by)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }
}
