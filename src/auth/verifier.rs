//! Access token verification.

use super::Identity;
use super::claims::{AccessClaims, REFRESH_AUDIENCE, single_audience};
use super::keys::VerificationContext;
use crate::access::AccessMatcher;
use crate::error::{AuthError, AuthResult};
use std::sync::Arc;
use std::time::Instant;

/// A genuine, unexpired access token's identity and capability claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAccess {
    pub identity: Identity,
    pub capabilities: String,
}

/// Checks access tokens. Holds no state beyond the verification key.
#[derive(Clone)]
pub struct TokenVerifier {
    verification: Arc<VerificationContext>,
}

impl TokenVerifier {
    pub fn new(verification: Arc<VerificationContext>) -> Self {
        Self { verification }
    }

    /// Check signature, expiry and issuer, and decode the access claims.
    pub fn verify_claims(&self, token: &str) -> AuthResult<VerifiedAccess> {
        let started = Instant::now();
        let result = self.decode(token);
        crate::metrics::observe_verify(started.elapsed().as_secs_f64());
        result
    }

    /// Verify `token` and test its capability claim against `matcher`.
    pub fn verify(&self, token: &str, matcher: &AccessMatcher) -> AuthResult<Identity> {
        let access = self.verify_claims(token)?;
        if !matcher.test(&access.capabilities) {
            tracing::debug!(
                user_id = access.identity.user_id,
                required = %matcher.pattern(),
                "Capability claim does not satisfy route"
            );
            return Err(AuthError::AccessDenied);
        }
        Ok(access.identity)
    }

    fn decode(&self, token: &str) -> AuthResult<VerifiedAccess> {
        let claims = self.verification.verify::<AccessClaims>(token, None)?;

        // A role with no grants yields an empty claim, which jwt-simple may
        // omit entirely; that is still a valid access token.
        let capabilities = match claims.audiences {
            None => String::new(),
            Some(audiences) => single_audience(Some(audiences)).ok_or(AuthError::InvalidToken)?,
        };
        if capabilities == REFRESH_AUDIENCE {
            return Err(AuthError::InvalidToken);
        }

        let email = claims.subject.ok_or(AuthError::InvalidToken)?;
        Ok(VerifiedAccess {
            identity: Identity {
                user_id: claims.custom.user_id,
                email,
                role_id: claims.custom.role_id,
            },
            capabilities,
        })
    }
}
