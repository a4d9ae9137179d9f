//! Content-addressable hashing for cache validators.

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes to a lowercase hex SHA-256 digest.
///
/// Pure and deterministic; used wherever an ETag-equivalent validator is
/// needed.
#[must_use]
pub fn content_hash(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    format!("{:x}", hasher.finalize())
}

/// Hash a JSON document over its canonical serialization.
///
/// `serde_json` serializes object keys in sorted order, so two documents that
/// dereference to the same structure produce the same digest regardless of
/// how their sources were formatted.
#[must_use]
pub fn canonical_hash(value: &serde_json::Value) -> String {
    content_hash(value.to_string())
}
