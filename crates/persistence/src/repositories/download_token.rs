//! Download token repository for database operations.
//!
//! Every expiry comparison uses the database `NOW()`.

use chrono::Duration;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::DownloadTokenEntity;
use crate::metrics::QueryTimer;

/// Input for creating a download token.
#[derive(Debug, Clone)]
pub struct DownloadTokenInput<'a> {
    pub token: &'a str,
    pub user_id: Uuid,
    pub loader_id: Uuid,
    pub cheat_name: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub ttl: Duration,
}

#[derive(Clone)]
pub struct DownloadTokenRepository {
    pool: PgPool,
}

impl DownloadTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        input: DownloadTokenInput<'_>,
    ) -> Result<DownloadTokenEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_download_token");
        let result = sqlx::query_as::<_, DownloadTokenEntity>(
            r#"
            INSERT INTO download_tokens (token, user_id, loader_id, cheat_name, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW() + make_interval(secs => $7))
            RETURNING token, user_id, loader_id, cheat_name, expires_at, used_at, ip_address, user_agent, created_at
            "#,
        )
        .bind(input.token)
        .bind(input.user_id)
        .bind(input.loader_id)
        .bind(input.cheat_name)
        .bind(input.ip_address)
        .bind(input.user_agent)
        .bind(input.ttl.num_seconds() as f64)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Newest unconsumed, unexpired token for the pair.
    pub async fn find_live(
        &self,
        user_id: Uuid,
        loader_id: Uuid,
    ) -> Result<Option<DownloadTokenEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_live_download_token");
        let result = sqlx::query_as::<_, DownloadTokenEntity>(
            r#"
            SELECT token, user_id, loader_id, cheat_name, expires_at, used_at, ip_address, user_agent, created_at
            FROM download_tokens
            WHERE user_id = $1
              AND loader_id = $2
              AND used_at IS NULL
              AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(loader_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_usable(&self, token: &str) -> Result<Option<DownloadTokenEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_usable_download_token");
        let result = sqlx::query_as::<_, DownloadTokenEntity>(
            r#"
            SELECT token, user_id, loader_id, cheat_name, expires_at, used_at, ip_address, user_agent, created_at
            FROM download_tokens
            WHERE token = $1
              AND used_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Consumes the token iff still usable. Returns rows affected.
    pub async fn mark_used(&self, token: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("mark_download_token_used");
        let result = sqlx::query(
            r#"
            UPDATE download_tokens
            SET used_at = NOW()
            WHERE token = $1
              AND used_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }

    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_expired_download_tokens");
        let result = sqlx::query("DELETE FROM download_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }
}
