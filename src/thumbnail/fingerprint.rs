//! Content fingerprints for thumbnail cache keys.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 16;

/// Fingerprint a document from its first `prefix_len` bytes and total length.
///
/// Two files with the same prefix and the same size collide. That trade is
/// accepted so large files are not hashed in full.
pub fn compute(bytes: &[u8], prefix_len: usize) -> String {
    let prefix = &bytes[..bytes.len().min(prefix_len)];

    let mut hasher = Sha256::new();
    hasher.update(prefix);
    hasher.update((bytes.len() as u64).to_le_bytes());

    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(FINGERPRINT_LEN);
    hex
}
