//! Domain layer for the entitlement backend.
//!
//! This crate contains:
//! - Domain models (license keys, subscriptions, invite codes, download tokens)
//! - Storage, blob and activity-log ports
//! - The entitlement services and their error taxonomy
//! - An in-memory store implementing the ports for tests and local runs

pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use engine::EntitlementEngine;
pub use error::{EntitlementError, EntitlementResult, ErrorKind};
