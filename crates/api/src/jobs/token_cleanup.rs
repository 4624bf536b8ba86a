//! Purges expired download tokens.

use std::time::Duration;

use domain::services::DownloadTokenService;

use super::scheduler::Job;

pub struct TokenCleanupJob {
    downloads: DownloadTokenService,
    interval: Duration,
}

impl TokenCleanupJob {
    pub fn new(downloads: DownloadTokenService, interval_minutes: u64) -> Self {
        Self {
            downloads,
            interval: Duration::from_secs(interval_minutes.max(1) * 60),
        }
    }
}

#[async_trait::async_trait]
impl Job for TokenCleanupJob {
    fn name(&self) -> &'static str {
        "download_token_cleanup"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), String> {
        self.downloads
            .cleanup()
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use domain::services::{EntitlementPolicy, RecordingActivityLog};
    use domain::store::InMemoryStore;
    use domain::EntitlementEngine;
    use std::sync::Arc;

    #[test]
    fn test_interval_from_minutes() {
        let engine = EntitlementEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
            Arc::new(RecordingActivityLog::new()),
            EntitlementPolicy::default(),
        );
        let job = TokenCleanupJob::new(engine.downloads.clone(), 15);
        assert_eq!(job.interval(), Duration::from_secs(900));
        assert_eq!(job.name(), "download_token_cleanup");
    }

    #[tokio::test]
    async fn test_execute_removes_expired_tokens() {
        let store = InMemoryStore::new();
        let engine = EntitlementEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(RecordingActivityLog::new()),
            EntitlementPolicy::default(),
        );
        let product = store.add_product("fatality", "Fatality").await;
        store
            .add_loader(product.id, "fatality", "fatality.exe", Some(vec![0xAB; 8]))
            .await;
        let user = store.add_user("alice").await;

        engine
            .downloads
            .issue("fatality", user.id, None, None)
            .await
            .unwrap();
        assert_eq!(store.download_token_count().await, 1);

        store.advance_clock(ChronoDuration::minutes(31));
        let job = TokenCleanupJob::new(engine.downloads.clone(), 15);
        job.execute().await.unwrap();

        assert_eq!(store.download_token_count().await, 0);
    }
}
