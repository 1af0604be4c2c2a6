//! Credential checks, token issuance, verification and refresh rotation.
//!
//! - [`CredentialVerifier`] turns a basic-auth credential into an [`Identity`].
//! - [`TokenIssuer`] signs an access/refresh pair and records the refresh
//!   token's hash for the device.
//! - [`TokenVerifier`] checks an access token against an [`AccessMatcher`].
//! - [`RefreshRotator`] exchanges a refresh token for a new pair, revoking
//!   the device session when a stale token is replayed.
//!
//! [`AccessMatcher`]: crate::access::AccessMatcher

mod claims;
mod credentials;
mod issuer;
mod keys;
mod refresh;
mod verifier;

pub use claims::{AccessClaims, REFRESH_AUDIENCE, RefreshClaims};
pub use credentials::{CredentialStore, CredentialVerifier, decode_basic, is_valid_email};
pub use issuer::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, MintedPair, TokenIssuer};
pub use keys::{KeyError, SigningContext, VerificationContext};
pub use refresh::RefreshRotator;
pub use verifier::{TokenVerifier, VerifiedAccess};

use serde::{Deserialize, Serialize};

/// An authenticated account as seen by the rest of the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub role_id: i64,
}

/// Access and refresh token returned by login and refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pair_debug_redacts() {
        let pair = TokenPair {
            access_token: "aaa.bbb.ccc".to_string(),
            refresh_token: "ddd.eee.fff".to_string(),
        };
        let debug = format!("{pair:?}");
        assert!(!debug.contains("aaa.bbb.ccc"));
        assert!(!debug.contains("ddd.eee.fff"));
    }

    #[test]
    fn test_token_pair_wire_names() {
        let pair = TokenPair {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&pair).unwrap(),
            serde_json::json!({ "access_token": "a", "refresh_token": "r" })
        );
    }
}
