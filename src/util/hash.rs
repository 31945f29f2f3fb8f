//! Hashing utilities for artifact fingerprints.

use sha2::{Digest, Sha256};

/// Length of the fingerprints shown in reports.
pub const SHORT_LEN: usize = 12;

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a string.
pub fn sha256_str(s: &str) -> String {
    sha256_bytes(s.as_bytes())
}

/// Short fingerprint of generated content.
pub fn short_fingerprint(contents: &str) -> String {
    let mut hash = sha256_str(contents);
    hash.truncate(SHORT_LEN);
    hash
}
