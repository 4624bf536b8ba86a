//! Hardware-id reset endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::HwidStatus;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminUser, CurrentUser};

/// Self-service reset. Responds with the post-reset status so clients can
/// show the next eligible date.
///
/// POST /api/v1/hwid/reset
pub async fn reset_hwid(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<HwidStatus>, ApiError> {
    state.engine.hwid.self_reset(user.user_id).await?;
    let status = state.engine.hwid.status(user.user_id).await?;
    Ok(Json(status))
}

/// GET /api/v1/hwid/status
pub async fn hwid_status(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<HwidStatus>, ApiError> {
    Ok(Json(state.engine.hwid.status(user.user_id).await?))
}

/// POST /api/v1/admin/users/:user_id/hwid/reset
pub async fn force_hwid_reset(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .hwid
        .force_reset(user_id, admin.admin_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
