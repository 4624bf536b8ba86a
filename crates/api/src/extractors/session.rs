//! Caller identity extractors.
//!
//! Both read the [`SessionIdentity`] inserted by
//! [`require_session`](crate::middleware::require_session); a handler that
//! uses them on an unauthenticated route is rejected with 401.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use shared::jwt::SessionIdentity;
use uuid::Uuid;

use crate::error::ApiError;

/// Any authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: Uuid,
}

/// An authenticated caller holding the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub admin_id: Uuid,
}

fn session(parts: &Parts) -> Result<SessionIdentity, ApiError> {
    parts
        .extensions
        .get::<SessionIdentity>()
        .copied()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = session(parts)?;
        Ok(CurrentUser {
            user_id: identity.user_id,
        })
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = session(parts)?;
        if !identity.role.is_admin() {
            return Err(ApiError::Forbidden(
                "Administrator role required".to_string(),
            ));
        }
        Ok(AdminUser {
            admin_id: identity.user_id,
        })
    }
}
