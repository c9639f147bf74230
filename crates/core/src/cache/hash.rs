//! Content-addressed cache key generation.

use md5::{Digest, Md5};

/// Compute the cache key for a URL: lowercase hex of its 128-bit MD5 digest.
///
/// The raw string is hashed as given, so the key is stable across runs and
/// machines.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
