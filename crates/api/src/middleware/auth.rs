//! Bearer session authentication.
//!
//! [`require_session`] turns `Authorization: Bearer <jwt>` into a
//! [`SessionIdentity`] stored in request extensions. [`require_admin`] must be
//! layered inside it and rejects non-admin sessions.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::jwt::{JwtConfig, JwtError, SessionIdentity};

use crate::app::AppState;
use crate::error::ApiError;

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&req) {
        Some(token) => token,
        None => {
            return ApiError::Unauthorized("Missing or invalid Authorization header".to_string())
                .into_response()
        }
    };

    match authenticate(&state.jwt, token) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<SessionIdentity>() {
        Some(identity) if identity.role.is_admin() => next.run(req).await,
        Some(identity) => {
            tracing::warn!(
                target: "security",
                user_id = %identity.user_id,
                path = %req.uri().path(),
                "Non-admin session on admin route"
            );
            ApiError::Forbidden("Administrator role required".to_string()).into_response()
        }
        None => ApiError::Unauthorized("Authentication required".to_string()).into_response(),
    }
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn authenticate(jwt: &JwtConfig, token: &str) -> Result<SessionIdentity, ApiError> {
    jwt.authenticate(token).map_err(|err| {
        match &err {
            JwtError::TokenExpired => tracing::debug!("Session token expired"),
            other => tracing::debug!(error = %other, "Session token rejected"),
        }
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })
}
