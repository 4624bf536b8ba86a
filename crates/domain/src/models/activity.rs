//! Activity log entries appended for state-changing operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Entitlement,
    Account,
    Download,
    /// Identity mismatches and other signals worth alerting on.
    Security,
}

impl std::fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityCategory::Entitlement => write!(f, "entitlement"),
            ActivityCategory::Account => write!(f, "account"),
            ActivityCategory::Download => write!(f, "download"),
            ActivityCategory::Security => write!(f, "security"),
        }
    }
}

/// One audit line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActivityEntry {
    pub actor_id: Option<Uuid>,
    pub category: ActivityCategory,
    pub action: String,
    pub target: Option<String>,
    pub details: Value,
}

impl ActivityEntry {
    pub fn new(category: ActivityCategory, action: impl Into<String>) -> Self {
        Self {
            actor_id: None,
            category,
            action: action.into(),
            target: None,
            details: Value::Null,
        }
    }

    /// Set the acting user or admin.
    pub fn by(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Set the affected resource.
    pub fn on(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}
