//! Unified error handling for capgate.
//!
//! Every failure the access-control core can produce is a variant of
//! [`AuthError`]. Callers match on the variant; the HTTP layer maps each
//! variant to a status code and a `WWW-Authenticate` challenge.

use crate::db::DbError;
use thiserror::Error;

// ============================================================================
// Auth Errors
// ============================================================================

/// Errors produced by credential checks, token issuance, verification and
/// refresh rotation.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed credential")]
    MalformedCredential,

    #[error("missing password")]
    MissingPassword,

    #[error("invalid email format")]
    InvalidEmailFormat,

    #[error("unknown identity")]
    UnknownIdentity,

    #[error("wrong password")]
    WrongPassword,

    /// Two access declarations (or two grants) name the same resource.
    #[error("duplicate resource in permission set: {0}")]
    DuplicateResource(String),

    #[error("no credentials presented")]
    MissingToken,

    #[error("token expired")]
    TokenExpired,

    /// The token is genuine but its capability claim does not satisfy the route.
    #[error("access denied")]
    AccessDenied,

    #[error("invalid token")]
    InvalidToken,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedCredential => "malformed_credential",
            Self::MissingPassword => "missing_password",
            Self::InvalidEmailFormat => "invalid_email_format",
            Self::UnknownIdentity => "unknown_identity",
            Self::WrongPassword => "wrong_password",
            Self::DuplicateResource(_) => "duplicate_resource",
            Self::MissingToken => "missing_token",
            Self::TokenExpired => "token_expired",
            Self::AccessDenied => "access_denied",
            Self::InvalidToken => "invalid_token",
            Self::Signing(_) => "signing_error",
            Self::Database(_) => "database_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show to the caller.
    ///
    /// `UnknownIdentity` and `WrongPassword` share one message so a response
    /// never reveals whether the account exists.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MalformedCredential => "credentials must be base64(email:password)",
            Self::MissingPassword => "password is required",
            Self::InvalidEmailFormat => "email address is not valid",
            Self::UnknownIdentity | Self::WrongPassword => "invalid email or password",
            Self::MissingToken => "authentication required",
            Self::TokenExpired => "the token expired",
            Self::AccessDenied => "insufficient permissions",
            Self::InvalidToken => "the token is invalid",
            Self::DuplicateResource(_)
            | Self::Signing(_)
            | Self::Database(_)
            | Self::Internal(_) => "internal server error",
        }
    }

    /// True for failures that belong to the credential (basic auth) stage.
    pub fn is_credential_stage(&self) -> bool {
        matches!(
            self,
            Self::MalformedCredential
                | Self::MissingPassword
                | Self::InvalidEmailFormat
                | Self::UnknownIdentity
                | Self::WrongPassword
        )
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::from(err))
    }
}

/// Result type for the access-control core.
pub type AuthResult<T> = Result<T, AuthError>;
