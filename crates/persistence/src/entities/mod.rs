//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod download_token;
pub mod invite_code;
pub mod license_key;
pub mod loader;
pub mod product;
pub mod subscription;
pub mod user;

pub use download_token::DownloadTokenEntity;
pub use invite_code::InviteCodeEntity;
pub use license_key::LicenseKeyEntity;
pub use loader::LoaderEntity;
pub use product::ProductEntity;
pub use subscription::{SubscriptionEntity, SubscriptionWithProductEntity};
pub use user::UserAccountEntity;
