use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use domain::EntitlementError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String, Vec<ValidationDetail>),

    #[error(transparent)]
    Entitlement(#[from] EntitlementError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

const GENERIC_INTERNAL_MESSAGE: &str = "An internal error occurred";

impl ApiError {
    /// Stable machine-readable code sent as `error`.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Validation(..) => "validation_error",
            ApiError::Internal(_) => "internal_error",
            ApiError::Entitlement(err) => match err {
                EntitlementError::Validation(_) => "validation_error",
                EntitlementError::NotFound(_) => "not_found",
                EntitlementError::AlreadyUsed { .. } => "already_used",
                EntitlementError::ProductFrozen(_) => "product_frozen",
                EntitlementError::Throttled { .. } => "throttled",
                EntitlementError::InvalidOrExpired => "invalid_or_expired",
                EntitlementError::SecurityViolation => "security_violation",
                EntitlementError::DataMissing(_) => "data_missing",
                EntitlementError::Storage(_) => "internal_error",
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(..) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Entitlement(err) => match err {
                EntitlementError::Validation(_) => StatusCode::BAD_REQUEST,
                EntitlementError::NotFound(_) => StatusCode::NOT_FOUND,
                EntitlementError::AlreadyUsed { .. }
                | EntitlementError::ProductFrozen(_)
                | EntitlementError::DataMissing(_) => StatusCode::CONFLICT,
                EntitlementError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
                EntitlementError::InvalidOrExpired => StatusCode::GONE,
                EntitlementError::SecurityViolation => StatusCode::FORBIDDEN,
                EntitlementError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized(msg) | ApiError::Forbidden(msg) => msg.clone(),
            ApiError::Validation(msg, _) => msg.clone(),
            ApiError::Internal(_) => GENERIC_INTERNAL_MESSAGE.to_string(),
            ApiError::Entitlement(err) => match err {
                EntitlementError::Validation(msg) => msg.clone(),
                EntitlementError::NotFound(what) => format!("{} not found", what),
                EntitlementError::AlreadyUsed { .. } => "This code has already been used".into(),
                EntitlementError::ProductFrozen(name) => {
                    format!("{} is currently frozen", name)
                }
                EntitlementError::Throttled { .. } => {
                    "HWID reset is on cooldown. Please try again later.".into()
                }
                EntitlementError::InvalidOrExpired => "Invalid or expired download link".into(),
                EntitlementError::SecurityViolation => {
                    "This download link was issued to another account".into()
                }
                EntitlementError::DataMissing(_) => "The requested file is not available".into(),
                EntitlementError::Storage(_) => GENERIC_INTERNAL_MESSAGE.to_string(),
            },
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::Validation(_, details) if !details.is_empty() => Some(json!(details)),
            ApiError::Entitlement(EntitlementError::Throttled { next_eligible_at }) => {
                Some(json!({ "retry_after": next_eligible_at }))
            }
            ApiError::Entitlement(EntitlementError::AlreadyUsed {
                used_at: Some(used_at),
                ..
            }) => Some(json!({ "used_at": used_at })),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => tracing::error!("Internal error: {}", detail),
            ApiError::Entitlement(EntitlementError::Storage(detail)) => {
                tracing::error!("Storage error: {}", detail)
            }
            _ => {}
        }

        let status = self.status();
        let body = ErrorBody {
            error: self.code(),
            message: self.message(),
            details: self.details(),
        };

        let mut response = (status, Json(body)).into_response();

        if let ApiError::Entitlement(EntitlementError::Throttled { next_eligible_at }) = &self {
            let seconds = (*next_eligible_at - Utc::now()).num_seconds().max(0);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                })
            })
            .collect();

        let message = if details.len() == 1 {
            details[0].message.clone()
        } else {
            format!("{} validation errors", details.len())
        };

        ApiError::Validation(message, details)
    }
}
