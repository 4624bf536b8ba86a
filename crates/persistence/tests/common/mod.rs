//! Fixtures for tests that run against a real PostgreSQL database.
//!
//! Set `TEST_DATABASE_URL` to enable them; without it every test returns
//! early. Rows are keyed by fresh UUIDs and names so tests can share one
//! database and run in parallel.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use domain::services::{EntitlementPolicy, TracingActivityLog};
use domain::EntitlementEngine;
use persistence::db::run_migrations;
use persistence::{PgBlobStore, PgEntitlementStore};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

/// Connects and migrates, or returns `None` when no test database is configured.
pub async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping PostgreSQL test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

pub struct PgHarness {
    pub pool: PgPool,
    pub store: PgEntitlementStore,
    pub engine: EntitlementEngine,
    pub admin_id: Uuid,
}

impl PgHarness {
    pub fn new(pool: PgPool) -> Self {
        let store = PgEntitlementStore::new(pool.clone());
        let engine = EntitlementEngine::new(
            Arc::new(store.clone()),
            Arc::new(PgBlobStore::new(pool.clone())),
            Arc::new(TracingActivityLog),
            EntitlementPolicy::default(),
        );
        Self {
            pool,
            store,
            engine,
            admin_id: Uuid::new_v4(),
        }
    }
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Inserts a product with a unique name and returns its id.
pub async fn insert_product(pool: &PgPool) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO products (name, display_name)
        VALUES ($1, 'Integration Product')
        RETURNING id
        "#,
    )
    .bind(format!("itest{}", suffix()))
    .fetch_one(pool)
    .await
    .expect("Failed to insert product")
}

/// Inserts a user with a bound HWID and returns its id.
pub async fn insert_user(pool: &PgPool) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO users (username, hwid)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(format!("user_{}", suffix()))
    .bind(format!("HWID-{}", suffix()))
    .fetch_one(pool)
    .await
    .expect("Failed to insert user")
}

/// Inserts an active loader with `payload` under a unique cheat name, which
/// is returned.
pub async fn insert_loader(pool: &PgPool, product_id: Uuid, payload: &[u8]) -> String {
    let cheat_name = format!("cheat_{}", suffix());
    sqlx::query(
        r#"
        INSERT INTO loaders (product_id, cheat_name, filename, file_size, file_data)
        VALUES ($1, $2, 'loader.exe', $3, $4)
        "#,
    )
    .bind(product_id)
    .bind(&cheat_name)
    .bind(payload.len() as i64)
    .bind(payload)
    .execute(pool)
    .await
    .expect("Failed to insert loader");
    cheat_name
}

/// Moves the user's last HWID reset to `seconds_ago` before the database clock.
pub async fn set_last_hwid_reset(pool: &PgPool, user_id: Uuid, seconds_ago: i64) {
    sqlx::query(
        r#"
        UPDATE users
        SET last_hwid_reset = NOW() - make_interval(secs => $2)
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(seconds_ago as f64)
    .execute(pool)
    .await
    .expect("Failed to set last_hwid_reset");
}

pub async fn subscription_rows(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscriptions WHERE user_id = $1 AND product_id = $2",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count subscriptions")
}
