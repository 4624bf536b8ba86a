use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use domain::EntitlementEngine;
use entitlement_api::{
    app::{create_app, AppState},
    config::Config,
    jobs::{JobScheduler, PoolMetricsJob, TokenCleanupJob},
    middleware,
};
use persistence::{PgActivityLog, PgBlobStore, PgEntitlementStore};
use shared::jwt::JwtConfig;
use tracing::info;

const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics()?;

    info!("Starting entitlement server v{}", env!("CARGO_PKG_VERSION"));

    let pool =
        persistence::db::create_pool(&persistence::db::DatabaseConfig::from(&config.database))
            .await?;
    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let jwt = JwtConfig::from_public_key(&config.jwt.public_key, config.jwt.leeway_secs)?;

    let engine = EntitlementEngine::new(
        Arc::new(PgEntitlementStore::new(pool.clone())),
        Arc::new(PgBlobStore::new(pool.clone())),
        Arc::new(PgActivityLog::new(pool.clone())),
        config.entitlements.policy(),
    );

    let mut scheduler = JobScheduler::new();
    scheduler.register(TokenCleanupJob::new(
        engine.downloads.clone(),
        config.entitlements.token_cleanup_interval_minutes,
    ));
    scheduler.register(PoolMetricsJob::new(pool));
    scheduler.start();

    let addr = config.socket_addr()?;
    let app = create_app(AppState::new(config, engine, jwt));

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
