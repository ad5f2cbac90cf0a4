//! Hashing utilities for relay client keys.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short, log-safe identifier for a client key (first 12 hex chars of its digest).
pub fn key_fingerprint(key: &str) -> String {
    let mut digest = sha256_hex(key);
    digest.truncate(12);
    digest
}

/// Compares two hex digests without short-circuiting on the first mismatch.
pub fn digests_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
