//! Persistence layer for the entitlement backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - PostgreSQL implementations of the domain storage ports

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use store::{PgActivityLog, PgBlobStore, PgEntitlementStore};
