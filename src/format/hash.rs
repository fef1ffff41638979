use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of an artifact's uncompressed body (§3, §4.2 step 7).
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
