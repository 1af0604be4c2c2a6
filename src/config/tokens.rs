//! Token signing configuration.

use serde::Deserialize;

/// Signature algorithm for issued tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SigningAlgorithm {
    /// HMAC-SHA256 with a shared secret.
    #[default]
    Hs256,
    /// Ed25519 with a PEM-encoded key pair.
    Ed25519,
}

/// Token issuance and verification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// `iss` claim written into, and required on, every token.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default)]
    pub algorithm: SigningAlgorithm,
    /// Shared secret for HS256. When unset an ephemeral one is generated.
    pub secret: Option<String>,
    /// PEM private key for Ed25519.
    pub private_key_path: Option<String>,
    /// Access token lifetime in seconds (default: 1 day).
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 30 days).
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            algorithm: SigningAlgorithm::default(),
            secret: None,
            private_key_path: None,
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
        }
    }
}

fn default_issuer() -> String {
    "capgate".to_string()
}

fn default_access_ttl() -> u64 {
    86_400
}

fn default_refresh_ttl() -> u64 {
    30 * 86_400
}

/// Minimum HS256 secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Check if a signing secret is a placeholder that should be changed.
pub fn is_default_secret(secret: &str) -> bool {
    secret.is_empty()
        || secret.contains("changeme")
        || secret.contains("default")
        || secret.contains("example")
        || secret.contains("replace")
        || secret.len() < MIN_SECRET_LEN
}
