//! Signing and verification contexts.
//!
//! Both are built once at startup from [`TokenConfig`] and handed to the
//! issuer, verifier and rotator. Nothing here is process-global.

use crate::config::{SigningAlgorithm, TokenConfig};
use crate::error::{AuthError, AuthResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jwt_simple::JWTError;
use jwt_simple::prelude::*;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use thiserror::Error;

/// Allowed clock difference between issuer and verifier.
const TIME_TOLERANCE_SECS: u64 = 60;

/// Errors while loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid key: {0}")]
    Invalid(String),
    #[error("tokens.private_key_path is required for ed25519")]
    MissingPrivateKey,
}

enum SigningKey {
    Hs256(HS256Key),
    Ed25519(Ed25519KeyPair),
}

enum VerifyingKey {
    Hs256(HS256Key),
    Ed25519(Ed25519PublicKey),
}

impl VerifyingKey {
    fn signature_len(&self) -> usize {
        match self {
            Self::Hs256(_) => 32,
            Self::Ed25519(_) => 64,
        }
    }
}

/// Key material and issuer used to sign tokens.
pub struct SigningContext {
    key: SigningKey,
    issuer: String,
}

impl SigningContext {
    /// HS256 context from a shared secret.
    pub fn hs256(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            key: SigningKey::Hs256(HS256Key::from_bytes(secret)),
            issuer: issuer.into(),
        }
    }

    /// Ed25519 context from a PEM-encoded private key.
    pub fn ed25519_pem(pem: &str, issuer: impl Into<String>) -> Result<Self, KeyError> {
        let key_pair = Ed25519KeyPair::from_pem(pem).map_err(|e| KeyError::Invalid(e.to_string()))?;
        Ok(Self {
            key: SigningKey::Ed25519(key_pair),
            issuer: issuer.into(),
        })
    }

    /// Ed25519 context with a freshly generated key pair.
    pub fn generate_ed25519(issuer: impl Into<String>) -> Self {
        Self {
            key: SigningKey::Ed25519(Ed25519KeyPair::generate()),
            issuer: issuer.into(),
        }
    }

    /// Build the signing context described by the token configuration.
    pub fn from_config(config: &TokenConfig) -> Result<Self, KeyError> {
        match config.algorithm {
            SigningAlgorithm::Hs256 => {
                let secret = match config.secret {
                    Some(ref secret) => secret.clone(),
                    None => ephemeral_secret(),
                };
                Ok(Self::hs256(secret.as_bytes(), config.issuer.clone()))
            }
            SigningAlgorithm::Ed25519 => {
                let path = config
                    .private_key_path
                    .as_ref()
                    .ok_or(KeyError::MissingPrivateKey)?;
                let pem = std::fs::read_to_string(path)?;
                Self::ed25519_pem(&pem, config.issuer.clone())
            }
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Matching verification context for tokens signed by this context.
    pub fn verification_context(&self) -> VerificationContext {
        let key = match self.key {
            SigningKey::Hs256(ref key) => VerifyingKey::Hs256(key.clone()),
            SigningKey::Ed25519(ref key_pair) => VerifyingKey::Ed25519(key_pair.public_key()),
        };
        VerificationContext {
            key,
            issuer: self.issuer.clone(),
        }
    }

    /// Stamp the issuer on `claims` and sign them.
    pub(crate) fn sign<T>(&self, claims: JWTClaims<T>) -> AuthResult<String>
    where
        T: Serialize + DeserializeOwned,
    {
        let claims = claims.with_issuer(&self.issuer);
        let signed = match self.key {
            SigningKey::Hs256(ref key) => key.authenticate(claims),
            SigningKey::Ed25519(ref key_pair) => key_pair.sign(claims),
        };
        signed.map_err(|e| AuthError::Signing(e.to_string()))
    }
}

/// Key material and expected issuer used to verify tokens.
pub struct VerificationContext {
    key: VerifyingKey,
    issuer: String,
}

impl VerificationContext {
    /// Ed25519 verification from a PEM-encoded public key.
    pub fn ed25519_public_pem(pem: &str, issuer: impl Into<String>) -> Result<Self, KeyError> {
        let key = Ed25519PublicKey::from_pem(pem).map_err(|e| KeyError::Invalid(e.to_string()))?;
        Ok(Self {
            key: VerifyingKey::Ed25519(key),
            issuer: issuer.into(),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verify signature, expiry and issuer, and decode the typed claims.
    ///
    /// When `audience` is given the token's `aud` must equal it.
    pub(crate) fn verify<T>(&self, token: &str, audience: Option<&str>) -> AuthResult<JWTClaims<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        if !is_compact_jws(token, self.key.signature_len()) {
            return Err(AuthError::InvalidToken);
        }

        let options = VerificationOptions {
            allowed_issuers: Some(HashSet::from([self.issuer.clone()])),
            allowed_audiences: audience.map(|aud| HashSet::from([aud.to_string()])),
            time_tolerance: Some(Duration::from_secs(TIME_TOLERANCE_SECS)),
            ..Default::default()
        };

        let verified = match self.key {
            VerifyingKey::Hs256(ref key) => key.verify_token::<T>(token, Some(options)),
            VerifyingKey::Ed25519(ref key) => key.verify_token::<T>(token, Some(options)),
        };
        verified.map_err(classify)
    }
}

/// Map a verification failure onto the error taxonomy.
///
/// Anything attributable to the presented token is `InvalidToken` (or
/// `TokenExpired`); everything else propagates as `Internal`. Segment
/// decoding cannot fail here since [`is_compact_jws`] already ran.
fn classify(err: jwt_simple::Error) -> AuthError {
    if let Some(jwt_err) = err.downcast_ref::<JWTError>() {
        return match jwt_err {
            JWTError::TokenHasExpired => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        };
    }
    if err.downcast_ref::<serde_json::Error>().is_some() {
        // claims present but of the wrong shape
        return AuthError::InvalidToken;
    }
    tracing::warn!(error = %err, "Unclassified token verification failure");
    AuthError::Internal(err.to_string())
}

/// Three canonical base64url segments, the last one decoding to exactly
/// `signature_len` bytes.
///
/// Rejects everything the segment decoder would: foreign characters,
/// impossible lengths and non-zero bits after the last whole byte.
fn is_compact_jws(token: &str, signature_len: usize) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments[..2].iter().any(|s| s.is_empty()) {
        return false;
    }
    segments[..2].iter().all(|s| URL_SAFE_NO_PAD.decode(s).is_ok())
        && URL_SAFE_NO_PAD
            .decode(segments[2])
            .is_ok_and(|signature| signature.len() == signature_len)
}

fn ephemeral_secret() -> String {
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect();
    tracing::warn!(
        "No tokens.secret configured - using ephemeral random secret. Issued tokens will NOT survive a restart. Set [tokens].secret in the config file for production use."
    );
    secret
}
