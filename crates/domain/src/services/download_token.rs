//! Single-use download tokens.
//!
//! A token moves from issued to consumed (once) or expired (by time), and
//! never leaves either terminal state. Expiry is judged against the store's
//! clock on both sides so issue and consume cannot disagree.

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use super::activity::ActivityLog;
use super::check;
use crate::error::{EntitlementError, EntitlementResult};
use crate::models::download_token::{generate_token, is_well_formed};
use crate::models::{
    ActivityCategory, ActivityEntry, DownloadPayload, IssuedDownloadToken, Loader,
    NewDownloadToken,
};
use crate::store::{BlobStore, EntitlementStore, StoreError};
use shared::crypto::fingerprint;
use shared::validation::validate_cheat_name;

#[derive(Clone)]
pub struct DownloadTokenService {
    store: Arc<dyn EntitlementStore>,
    blobs: Arc<dyn BlobStore>,
    activity: Arc<dyn ActivityLog>,
    ttl: Duration,
    attempts: u32,
}

impl DownloadTokenService {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        blobs: Arc<dyn BlobStore>,
        activity: Arc<dyn ActivityLog>,
        ttl: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            store,
            blobs,
            activity,
            ttl,
            attempts: attempts.max(1),
        }
    }

    /// Issues a token for the active loader named `cheat_name`, or hands back
    /// the caller's live one for that loader (`reused = true`).
    pub async fn issue(
        &self,
        cheat_name: &str,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> EntitlementResult<IssuedDownloadToken> {
        check(validate_cheat_name(cheat_name))?;

        let loader = self
            .store
            .find_active_loader(cheat_name)
            .await?
            .ok_or_else(|| EntitlementError::not_found("Loader"))?;

        if self.store.find_user(user_id).await?.is_none() {
            return Err(EntitlementError::not_found("User"));
        }

        // Opportunistic GC. A failure here must not block the download.
        match self.store.delete_expired_download_tokens().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "Expired download tokens removed"),
            Err(err) => tracing::warn!(error = %err, "Expired download token cleanup failed"),
        }

        if let Some(live) = self
            .store
            .find_live_download_token(user_id, loader.id)
            .await?
        {
            tracing::debug!(
                user_id = %user_id,
                loader_id = %loader.id,
                token_ref = %fingerprint(&live.token),
                "Reusing live download token"
            );
            return Ok(IssuedDownloadToken {
                token: live.token,
                expires_at: live.expires_at,
                filename: loader.filename,
                size: loader.file_size,
                reused: true,
            });
        }

        for attempt in 1..=self.attempts {
            let candidate = NewDownloadToken {
                token: generate_token(),
                user_id,
                loader_id: loader.id,
                cheat_name: loader.cheat_name.clone(),
                ip_address: ip_address.clone(),
                user_agent: user_agent.clone(),
            };

            match self.store.insert_download_token(&candidate, self.ttl).await {
                Ok(row) => {
                    let token_ref = fingerprint(&row.token);
                    tracing::info!(
                        user_id = %user_id,
                        loader_id = %loader.id,
                        token_ref = %token_ref,
                        expires_at = %row.expires_at,
                        "Download token issued"
                    );
                    self.activity
                        .record(
                            ActivityEntry::new(ActivityCategory::Download, "download_token.issued")
                                .by(user_id)
                                .on(format!("loader:{}", loader.cheat_name))
                                .with_details(json!({
                                    "token_ref": token_ref,
                                    "ip_address": row.ip_address,
                                })),
                        )
                        .await;

                    return Ok(IssuedDownloadToken {
                        token: row.token,
                        expires_at: row.expires_at,
                        filename: loader.filename,
                        size: loader.file_size,
                        reused: false,
                    });
                }
                Err(StoreError::Duplicate(_)) => {
                    tracing::debug!(attempt, "Download token collision, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::error!(attempts = self.attempts, "Failed to generate a unique download token");
        Err(EntitlementError::Storage(
            "Could not generate a unique download token".to_string(),
        ))
    }

    /// Releases the payload bound to `token`, exactly once, to the user it
    /// was issued to.
    ///
    /// Unknown, consumed and expired tokens are indistinguishable to the
    /// caller. A token presented by anyone but its owner is a
    /// `SecurityViolation` and stays usable for the owner.
    pub async fn consume(&self, token: &str, caller_id: Uuid) -> EntitlementResult<DownloadPayload> {
        if !is_well_formed(token) {
            return Err(EntitlementError::InvalidOrExpired);
        }
        let token_ref = fingerprint(token);

        let row = match self.store.find_usable_download_token(token).await? {
            Some(row) => row,
            None => {
                tracing::debug!(token_ref = %token_ref, "Download token invalid or expired");
                return Err(EntitlementError::InvalidOrExpired);
            }
        };

        if row.user_id != caller_id {
            tracing::warn!(
                target: "security",
                token_ref = %token_ref,
                bound_user = %row.user_id,
                caller = %caller_id,
                ip_address = ?row.ip_address,
                "Download token presented by a different user"
            );
            self.activity
                .record(
                    ActivityEntry::new(ActivityCategory::Security, "download_token.identity_mismatch")
                        .by(caller_id)
                        .on(format!("loader:{}", row.cheat_name))
                        .with_details(json!({
                            "token_ref": token_ref,
                            "bound_user": row.user_id,
                        })),
                )
                .await;
            return Err(EntitlementError::SecurityViolation);
        }

        let loader = self.loader_with_payload(row.loader_id).await?;
        let payload = match self.blobs.fetch(loader.id).await? {
            Some(bytes) => bytes,
            None => {
                tracing::error!(loader_id = %loader.id, "Loader payload missing from blob store");
                return Err(EntitlementError::DataMissing(
                    "Loader payload is unavailable".to_string(),
                ));
            }
        };

        if self.store.mark_download_token_used(token).await? == 0 {
            tracing::info!(token_ref = %token_ref, "Download token consumed concurrently");
            return Err(EntitlementError::InvalidOrExpired);
        }

        if let Err(err) = self
            .store
            .increment_download_counters(loader.id, loader.product_id)
            .await
        {
            tracing::warn!(loader_id = %loader.id, error = %err, "Download counter update failed");
        }

        tracing::info!(
            user_id = %caller_id,
            loader_id = %loader.id,
            token_ref = %token_ref,
            size = payload.len(),
            "Download token consumed"
        );
        self.activity
            .record(
                ActivityEntry::new(ActivityCategory::Download, "download_token.consumed")
                    .by(caller_id)
                    .on(format!("loader:{}", loader.cheat_name))
                    .with_details(json!({ "token_ref": token_ref })),
            )
            .await;

        Ok(DownloadPayload {
            size: payload.len() as i64,
            payload,
            filename: loader.filename,
        })
    }

    /// Deletes every expired token. Idempotent.
    pub async fn cleanup(&self) -> EntitlementResult<u64> {
        let removed = self.store.delete_expired_download_tokens().await?;
        if removed > 0 {
            tracing::info!(removed, "Expired download tokens removed");
        }
        Ok(removed)
    }

    async fn loader_with_payload(&self, loader_id: Uuid) -> EntitlementResult<Loader> {
        match self.store.find_loader(loader_id).await? {
            Some(loader) if loader.has_payload => Ok(loader),
            _ => {
                tracing::error!(loader_id = %loader_id, "Loader has no payload");
                Err(EntitlementError::DataMissing(
                    "Loader payload is unavailable".to_string(),
                ))
            }
        }
    }
}
