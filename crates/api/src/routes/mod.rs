//! HTTP route handlers.

pub mod downloads;
pub mod health;
pub mod hwid;
pub mod invite_codes;
pub mod license_keys;
pub mod subscriptions;
