//! Refresh-token digests.
//!
//! Only `sha256(refresh_token)` is ever persisted. Comparison is constant
//! time so a stored hash cannot be probed byte by byte.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Lowercase hex SHA-256 of a token.
pub fn token_hash(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Constant-time equality of two digests.
pub fn hashes_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            token_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hashes_match() {
        let h = token_hash("refresh-token");
        assert!(hashes_match(&h, &token_hash("refresh-token")));
        assert!(!hashes_match(&h, &token_hash("refresh-tokem")));
        assert!(!hashes_match(&h, ""));
    }
}
