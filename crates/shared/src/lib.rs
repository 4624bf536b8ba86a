//! Shared utilities and common types for the entitlement backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (random tokens, hashing, log-safe fingerprints)
//! - Bearer token validation for caller identity (RS256 JWT)
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod validation;
