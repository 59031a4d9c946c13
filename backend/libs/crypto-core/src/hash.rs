use sha2::{Digest, Sha256};

/// SHA-256 digest of `input`. Key fingerprints take a prefix of this digest,
/// so the output must stay stable across releases.
pub fn sha256(input: &[u8]) -> [u8; 32] {
    Sha256::digest(input).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_and_input_sensitive() {
        let first = sha256(b"conversation key material");
        let second = sha256(b"conversation key material");
        assert_eq!(first, second);
        assert_ne!(first, sha256(b"other key material"));
    }
}
