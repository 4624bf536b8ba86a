//! User repository. Reads account rows and rewrites the HWID columns.

use chrono::Duration;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserAccountEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserAccountEntity>(
            r#"
            SELECT id, username, hwid, hwid_reset_count, last_hwid_reset
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Clears the HWID and bumps the reset counter.
    ///
    /// With a cooldown, the row is only touched when the previous reset is
    /// at least that old, judged by the database clock.
    pub async fn reset_hwid(
        &self,
        id: Uuid,
        cooldown: Option<Duration>,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("reset_user_hwid");
        let result = match cooldown {
            Some(cooldown) => {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET hwid = NULL,
                        hwid_reset_count = hwid_reset_count + 1,
                        last_hwid_reset = NOW()
                    WHERE id = $1
                      AND (last_hwid_reset IS NULL
                           OR last_hwid_reset <= NOW() - make_interval(secs => $2))
                    "#,
                )
                .bind(id)
                .bind(cooldown.num_seconds() as f64)
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET hwid = NULL,
                        hwid_reset_count = hwid_reset_count + 1,
                        last_hwid_reset = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .execute(&self.pool)
                .await
            }
        };
        timer.record();
        result.map(|r| r.rows_affected())
    }
}
