//! Liveness probe.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: StoreHealth,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// The store clock used for every expiry comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<DateTime<Utc>>,
}

/// GET /api/health
///
/// Round-trips the store clock. 503 when the store is unreachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();
    let clock = state.engine.store().now().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, store) = match clock {
        Ok(now) => (
            StatusCode::OK,
            StoreHealth {
                connected: true,
                latency_ms: Some(latency_ms),
                clock: Some(now),
            },
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Health check could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                StoreHealth {
                    connected: false,
                    latency_ms: None,
                    clock: None,
                },
            )
        }
    };

    let response = HealthResponse {
        status: if store.connected { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        store,
    };
    (status, Json(response))
}
