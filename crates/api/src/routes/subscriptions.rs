//! Subscription listing and administrative adjustments.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::subscription::{AdjustSubscriptionRequest, RevokeSubscriptionRequest};
use domain::models::{Subscription, SubscriptionSummary};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminUser, CurrentUser};

#[derive(Debug, Serialize)]
pub struct SubscriptionListResponse {
    pub subscriptions: Vec<SubscriptionSummary>,
}

/// GET /api/v1/subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<SubscriptionListResponse>, ApiError> {
    let subscriptions = state.engine.subscriptions.list_active(user.user_id).await?;
    Ok(Json(SubscriptionListResponse { subscriptions }))
}

/// POST /api/v1/admin/subscriptions/grant
pub async fn grant_subscription(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<AdjustSubscriptionRequest>,
) -> Result<Json<Subscription>, ApiError> {
    request.validate()?;

    let subscription = state
        .engine
        .subscriptions
        .grant(
            request.user_id,
            request.product_id,
            request.days,
            admin.admin_id,
        )
        .await?;
    Ok(Json(subscription))
}

/// POST /api/v1/admin/subscriptions/extend
///
/// Adds days to any row still flagged active, including one whose end date
/// has already passed.
pub async fn extend_subscription(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<AdjustSubscriptionRequest>,
) -> Result<Json<Subscription>, ApiError> {
    request.validate()?;

    let subscription = state
        .engine
        .subscriptions
        .extend(
            request.user_id,
            request.product_id,
            request.days,
            admin.admin_id,
        )
        .await?;
    Ok(Json(subscription))
}

/// POST /api/v1/admin/subscriptions/revoke
pub async fn revoke_subscription(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<RevokeSubscriptionRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .subscriptions
        .revoke(request.user_id, request.product_id, admin.admin_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
