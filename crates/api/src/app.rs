use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::EntitlementEngine;
use shared::jwt::JwtConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, require_session, trace_id,
};
use crate::routes::{downloads, health, hwid, invite_codes, license_keys, subscriptions};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: EntitlementEngine,
    pub jwt: Arc<JwtConfig>,
}

impl AppState {
    pub fn new(config: Config, engine: EntitlementEngine, jwt: JwtConfig) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            jwt: Arc::new(jwt),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Any authenticated session
    let user_routes = Router::new()
        .route(
            "/api/v1/license-keys/activate",
            post(license_keys::activate_license_key),
        )
        .route(
            "/api/v1/subscriptions",
            get(subscriptions::list_subscriptions),
        )
        .route("/api/v1/hwid/reset", post(hwid::reset_hwid))
        .route("/api/v1/hwid/status", get(hwid::hwid_status))
        .route(
            "/api/v1/invite-codes/:code/consume",
            post(invite_codes::consume_invite_code),
        )
        .route(
            "/api/v1/downloads/:cheat_name/token",
            post(downloads::issue_download_token),
        )
        .route(
            "/api/v1/downloads/token/:token",
            get(downloads::consume_download_token),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    // Admin sessions only (require_session runs first, then require_admin)
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/license-keys",
            post(license_keys::generate_license_keys),
        )
        .route(
            "/api/v1/admin/subscriptions/grant",
            post(subscriptions::grant_subscription),
        )
        .route(
            "/api/v1/admin/subscriptions/extend",
            post(subscriptions::extend_subscription),
        )
        .route(
            "/api/v1/admin/subscriptions/revoke",
            post(subscriptions::revoke_subscription),
        )
        .route(
            "/api/v1/admin/users/:user_id/hwid/reset",
            post(hwid::force_hwid_reset),
        )
        .route(
            "/api/v1/admin/invite-codes",
            post(invite_codes::create_invite_codes),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/metrics", get(metrics_handler))
        .route(
            "/api/v1/invite-codes/:code",
            get(invite_codes::validate_invite_code),
        );

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        // Bottom layers run first
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
