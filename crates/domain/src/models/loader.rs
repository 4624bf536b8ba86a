//! Loader artifact model.
//!
//! A loader is the downloadable binary for a product. Only its identity,
//! active flag and whether a payload is stored matter here; the bytes live
//! behind the blob store port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Loader {
    pub id: Uuid,
    pub product_id: Uuid,
    pub cheat_name: String,
    /// Original filename presented to the downloader.
    pub filename: String,
    pub file_size: i64,
    pub is_active: bool,
    pub has_payload: bool,
    pub download_count: i64,
    pub updated_at: DateTime<Utc>,
}
