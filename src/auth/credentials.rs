//! Basic-auth credential verification.
//!
//! The credential is `base64(email:password)`. Checks run in a fixed order:
//! decoding, presence of a password, email syntax, account lookup, password
//! hash.

use super::Identity;
use crate::db::{AccountRepository, DbError, StoredCredential};
use crate::error::{AuthError, AuthResult};
use crate::security::password::{dummy_verify, verify_password};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

/// Lookup seam between credential verification and account storage.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_credential(&self, email: &str) -> Result<Option<StoredCredential>, DbError>;
}

#[async_trait]
impl CredentialStore for AccountRepository<'_> {
    async fn find_credential(&self, email: &str) -> Result<Option<StoredCredential>, DbError> {
        AccountRepository::find_credential(self, email).await
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

/// Email syntax check applied to basic-auth usernames.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Decode `base64(email:password)`.
///
/// The password is split off at the first colon, so it may itself contain
/// colons. It is returned in a buffer that is wiped on drop.
pub fn decode_basic(raw: &str) -> AuthResult<(String, Zeroizing<String>)> {
    let mut decoded = STANDARD
        .decode(raw.trim())
        .map_err(|_| AuthError::MalformedCredential)?;

    let parsed = std::str::from_utf8(&decoded).ok().and_then(|text| {
        text.split_once(':')
            .map(|(email, password)| (email.to_string(), Zeroizing::new(password.to_string())))
    });
    decoded.zeroize();

    parsed.ok_or(AuthError::MalformedCredential)
}

/// Verifies basic-auth credentials against a [`CredentialStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialVerifier;

impl CredentialVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a raw basic-auth credential to an identity.
    ///
    /// Recording the login time is left to the caller.
    pub async fn verify<S>(&self, raw_credential: &str, store: &S) -> AuthResult<Identity>
    where
        S: CredentialStore + ?Sized,
    {
        let (email, password) = decode_basic(raw_credential)?;

        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmailFormat);
        }

        let Some(stored) = store.find_credential(&email).await? else {
            dummy_verify(&password);
            debug!(email = %email, "Login for unknown account");
            return Err(AuthError::UnknownIdentity);
        };

        let matches = verify_password(&password, &stored.password_hash).map_err(|e| {
            AuthError::Internal(format!("stored password hash unreadable: {e}"))
        })?;
        if !matches {
            debug!(user_id = stored.user_id, "Login with wrong password");
            return Err(AuthError::WrongPassword);
        }

        Ok(Identity {
            user_id: stored.user_id,
            email: stored.email,
            role_id: stored.role_id,
        })
    }
}
