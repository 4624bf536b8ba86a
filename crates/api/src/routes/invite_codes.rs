//! Registration invite codes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::invite_code::{CreateInviteCodesRequest, InviteCodeValidity};
use domain::models::InviteCode;
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminUser, CurrentUser};

#[derive(Debug, Serialize)]
pub struct CreateInviteCodesResponse {
    pub codes: Vec<InviteCode>,
}

#[derive(Debug, Serialize)]
pub struct ConsumeInviteCodeResponse {
    pub consumed: bool,
}

/// POST /api/v1/admin/invite-codes
pub async fn create_invite_codes(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<CreateInviteCodesRequest>,
) -> Result<(StatusCode, Json<CreateInviteCodesResponse>), ApiError> {
    request.validate()?;

    let codes = state
        .engine
        .invites
        .generate(request.count, admin.admin_id)
        .await?;
    Ok((StatusCode::CREATED, Json(CreateInviteCodesResponse { codes })))
}

/// Public pre-registration check.
///
/// GET /api/v1/invite-codes/:code
pub async fn validate_invite_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<InviteCodeValidity>, ApiError> {
    let valid = state.engine.invites.validate(&code).await?;
    Ok(Json(InviteCodeValidity { code, valid }))
}

/// Claims the code for the caller. `consumed` is false when the code is
/// unknown or was already claimed.
///
/// POST /api/v1/invite-codes/:code/consume
pub async fn consume_invite_code(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<ConsumeInviteCodeResponse>, ApiError> {
    let consumed = state.engine.invites.consume(&code, user.user_id).await?;
    Ok(Json(ConsumeInviteCodeResponse { consumed }))
}
