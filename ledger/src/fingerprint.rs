use sha2::{Digest, Sha256};

/// Deterministic, order-sensitive fingerprint of submission text.
///
/// SHA-256 over the raw bytes, hex encoded. Whitespace and formatting are
/// deliberately not normalized: only exact duplicates collide. The hash is
/// used for duplicate detection, not for anything security-sensitive.
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
