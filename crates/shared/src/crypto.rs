//! Cryptographic utilities for token generation and hashing.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of hex characters kept when fingerprinting a secret for logs.
const FINGERPRINT_LEN: usize = 12;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates `byte_len` random bytes from the thread-local CSPRNG and
/// returns them lowercase hex-encoded (two characters per byte).
pub fn random_hex(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Same as [`random_hex`] but upper-cased, for human-shareable codes.
pub fn random_hex_upper(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

/// Short, non-reversible reference to a secret so it can appear in logs.
pub fn fingerprint(secret: &str) -> String {
    let mut hash = sha256_hex(secret);
    hash.truncate(FINGERPRINT_LEN);
    hash
}
