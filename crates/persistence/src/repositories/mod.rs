//! Repository implementations for database operations.

pub mod activity_log;
pub mod download_token;
pub mod invite_code;
pub mod license_key;
pub mod loader;
pub mod product;
pub mod subscription;
pub mod user;

pub use activity_log::ActivityLogRepository;
pub use download_token::{DownloadTokenInput, DownloadTokenRepository};
pub use invite_code::InviteCodeRepository;
pub use license_key::LicenseKeyRepository;
pub use loader::LoaderRepository;
pub use product::ProductRepository;
pub use subscription::SubscriptionRepository;
pub use user::UserRepository;
