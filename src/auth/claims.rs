//! Typed token claims.
//!
//! Standard claims (`sub`, `aud`, `iss`, `exp`, `jti`) live on the
//! `JWTClaims` envelope; these structs are the custom fields flattened next
//! to them. Deserialization is the validation: a token whose custom fields
//! are missing or of the wrong JSON type fails to decode.

use jwt_simple::prelude::Audiences;
use serde::{Deserialize, Serialize};

/// `aud` value of every refresh token.
pub const REFRESH_AUDIENCE: &str = "refresh";

/// Custom claims of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "roleId")]
    pub role_id: i64,
}

/// Custom claims of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub device: String,
}

/// The single audience string of a token, if it has exactly one.
pub(crate) fn single_audience(audiences: Option<Audiences>) -> Option<String> {
    match audiences? {
        Audiences::AsString(aud) => Some(aud),
        Audiences::AsSet(set) if set.len() == 1 => set.into_iter().next(),
        Audiences::AsSet(_) => None,
    }
}
