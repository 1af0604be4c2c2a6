//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, SigningAlgorithm};
use super::tokens::MIN_SECRET_LEN;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.realm must not be empty")]
    EmptyRealm,
    #[error("tokens.issuer must not be empty")]
    EmptyIssuer,
    #[error("tokens.secret must be at least 32 bytes, got {0}")]
    WeakSecret(usize),
    #[error("tokens.private_key_path is required for ed25519")]
    MissingPrivateKey,
    #[error("tokens.private_key_path does not exist: {0}")]
    PrivateKeyNotFound(String),
    #[error("tokens.{0} must be greater than zero")]
    ZeroTtl(&'static str),
    #[error("tokens.access_ttl_secs must be shorter than tokens.refresh_ttl_secs")]
    AccessOutlivesRefresh,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.realm.is_empty() {
        errors.push(ValidationError::EmptyRealm);
    }

    let tokens = &config.tokens;
    if tokens.issuer.is_empty() {
        errors.push(ValidationError::EmptyIssuer);
    }

    match tokens.algorithm {
        SigningAlgorithm::Hs256 => {
            if let Some(ref secret) = tokens.secret
                && secret.len() < MIN_SECRET_LEN
            {
                errors.push(ValidationError::WeakSecret(secret.len()));
            }
        }
        SigningAlgorithm::Ed25519 => match tokens.private_key_path {
            None => errors.push(ValidationError::MissingPrivateKey),
            Some(ref path) if !Path::new(path).exists() => {
                errors.push(ValidationError::PrivateKeyNotFound(path.clone()));
            }
            Some(_) => {}
        },
    }

    if tokens.access_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTtl("access_ttl_secs"));
    }
    if tokens.refresh_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTtl("refresh_ttl_secs"));
    }
    if tokens.access_ttl_secs >= tokens.refresh_ttl_secs {
        errors.push(ValidationError::AccessOutlivesRefresh);
    }

    let db_path = &config.database.path;
    if db_path != ":memory:"
        && let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::DatabasePathInvalid(db_path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
