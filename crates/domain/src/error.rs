//! Error taxonomy for entitlement operations.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

pub type EntitlementResult<T> = Result<T, EntitlementError>;

/// Caller-facing category of an [`EntitlementError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Throttled,
    InvalidOrExpired,
    SecurityViolation,
    DataMissing,
    TransientStorage,
}

#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already used")]
    AlreadyUsed {
        used_by: Option<Uuid>,
        used_at: Option<DateTime<Utc>>,
    },

    #[error("Product is frozen: {0}")]
    ProductFrozen(String),

    #[error("Throttled until {next_eligible_at}")]
    Throttled { next_eligible_at: DateTime<Utc> },

    #[error("Invalid or expired token")]
    InvalidOrExpired,

    #[error("Token is bound to another user")]
    SecurityViolation,

    #[error("Data missing: {0}")]
    DataMissing(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EntitlementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EntitlementError::Validation(_) => ErrorKind::Validation,
            EntitlementError::NotFound(_) => ErrorKind::NotFound,
            EntitlementError::AlreadyUsed { .. } | EntitlementError::ProductFrozen(_) => {
                ErrorKind::Conflict
            }
            EntitlementError::Throttled { .. } => ErrorKind::Throttled,
            EntitlementError::InvalidOrExpired => ErrorKind::InvalidOrExpired,
            EntitlementError::SecurityViolation => ErrorKind::SecurityViolation,
            EntitlementError::DataMissing(_) => ErrorKind::DataMissing,
            EntitlementError::Storage(_) => ErrorKind::TransientStorage,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        EntitlementError::NotFound(what.into())
    }
}

impl From<StoreError> for EntitlementError {
    fn from(err: StoreError) -> Self {
        // Detail stays in the logs; callers only learn that storage failed.
        tracing::error!(error = %err, "Entitlement store failure");
        EntitlementError::Storage("Storage temporarily unavailable".to_string())
    }
}

impl From<validator::ValidationErrors> for EntitlementError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();
        EntitlementError::Validation(messages.join(", "))
    }
}
