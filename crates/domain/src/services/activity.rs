//! Activity log sink.
//!
//! Recording is fire-and-forget: implementations log their own failures and
//! never surface them to the operation being audited.

#[cfg(any(test, feature = "test-support"))]
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::models::{ActivityCategory, ActivityEntry};

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, entry: ActivityEntry);
}

/// Writes entries to the tracing pipeline only.
#[derive(Debug, Clone, Default)]
pub struct TracingActivityLog;

#[async_trait]
impl ActivityLog for TracingActivityLog {
    async fn record(&self, entry: ActivityEntry) {
        match entry.category {
            ActivityCategory::Security => tracing::warn!(
                target: "security",
                actor_id = ?entry.actor_id,
                action = %entry.action,
                target_ref = ?entry.target,
                details = %entry.details,
                "Activity recorded"
            ),
            category => tracing::info!(
                category = %category,
                actor_id = ?entry.actor_id,
                action = %entry.action,
                target_ref = ?entry.target,
                details = %entry.details,
                "Activity recorded"
            ),
        }
    }
}

/// Keeps entries in memory for assertions.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct RecordingActivityLog {
    entries: Mutex<Vec<ActivityEntry>>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries whose action equals `action`.
    pub fn actions(&self, action: &str) -> Vec<ActivityEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.action == action)
            .collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ActivityLog for RecordingActivityLog {
    async fn record(&self, entry: ActivityEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
