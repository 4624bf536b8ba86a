//! Custom Axum extractors.

pub mod client_info;
pub mod session;

pub use client_info::ClientInfo;
pub use session::{AdminUser, CurrentUser};
