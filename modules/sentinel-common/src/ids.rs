use sha2::{Digest, Sha256};

/// 32-hex-character digest used as the cross-run `external_id` dedup key.
///
/// Truncates the SHA-256 digest to its first 16 bytes (32 hex chars),
/// matching the `hex32(sha256(...))` convention used by every adapter.
pub fn hex32(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex32_is_32_chars_and_deterministic() {
        let a = hex32("rss:https://example.com/1");
        let b = hex32("rss:https://example.com/1");
        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
    }

    #[test]
    fn hex32_differs_by_prefix() {
        assert_ne!(hex32("rss:x"), hex32("gdelt:x"));
    }
}
