//! Domain models for the entitlement backend.

pub mod activity;
pub mod download_token;
pub mod invite_code;
pub mod license_key;
pub mod loader;
pub mod product;
pub mod subscription;
pub mod user;

pub use activity::{ActivityCategory, ActivityEntry};
pub use download_token::{
    DownloadPayload, DownloadToken, DownloadTokenState, IssuedDownloadToken, NewDownloadToken,
};
pub use invite_code::InviteCode;
pub use license_key::{ActivationResult, KeyRecord, LicenseKey, NewLicenseKey};
pub use loader::Loader;
pub use product::Product;
pub use subscription::{
    MergeOutcome, Subscription, SubscriptionSummary, SubscriptionWindow, SubscriptionWrite,
    WindowPolicy,
};
pub use user::{HwidStatus, UserAccount};
