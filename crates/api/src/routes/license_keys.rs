//! License key issuance and redemption.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::license_key::{ActivateLicenseKeyRequest, GenerateLicenseKeysRequest};
use domain::models::{ActivationResult, KeyRecord};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminUser, CurrentUser};
use crate::middleware::metrics::record_license_key_activated;

#[derive(Debug, Serialize)]
pub struct GenerateLicenseKeysResponse {
    pub keys: Vec<KeyRecord>,
}

/// Mint one or more keys for a product.
///
/// POST /api/v1/admin/license-keys
pub async fn generate_license_keys(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<GenerateLicenseKeysRequest>,
) -> Result<(StatusCode, Json<GenerateLicenseKeysResponse>), ApiError> {
    request.validate()?;

    let keys = state
        .engine
        .license_keys
        .generate_batch(
            request.product_id,
            request.duration_days,
            request.count,
            admin.admin_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(GenerateLicenseKeysResponse { keys })))
}

/// Redeem a key for the calling user.
///
/// POST /api/v1/license-keys/activate
pub async fn activate_license_key(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ActivateLicenseKeyRequest>,
) -> Result<Json<ActivationResult>, ApiError> {
    request.validate()?;

    let result = state
        .engine
        .license_keys
        .activate(&request.code, user.user_id)
        .await?;
    record_license_key_activated();

    Ok(Json(result))
}
