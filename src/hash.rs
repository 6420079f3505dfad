use sha2::{Digest, Sha256};

/// SHA-256 hex digest of the trimmed content; the dedup key for clips.
pub fn content_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.trim().as_bytes()))
}
