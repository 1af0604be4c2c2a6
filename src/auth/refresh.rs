//! Refresh token rotation with reuse detection.
//!
//! Each (account, device) has exactly one live refresh token. Presenting it
//! swaps it for a new pair; presenting anything older revokes the device
//! session, since only a copied token can still be around after a rotation.

use super::claims::{REFRESH_AUDIENCE, RefreshClaims};
use super::issuer::TokenIssuer;
use super::keys::VerificationContext;
use super::{Identity, TokenPair};
use crate::db::{Database, load_account, load_permissions, sessions};
use crate::error::{AuthError, AuthResult};
use crate::security::{hashes_match, token_hash};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Exchanges refresh tokens for new token pairs.
#[derive(Clone)]
pub struct RefreshRotator {
    issuer: TokenIssuer,
    verification: Arc<VerificationContext>,
    db: Database,
}

impl RefreshRotator {
    pub fn new(issuer: TokenIssuer, verification: Arc<VerificationContext>, db: Database) -> Self {
        Self {
            issuer,
            verification,
            db,
        }
    }

    /// Rotate `refresh_token`, presented by `device`.
    ///
    /// The read, compare and write run in one transaction. A token that does
    /// not match the stored hash, or that loses a race against a concurrent
    /// rotation, deletes the device's record before failing.
    pub async fn rotate(&self, refresh_token: &str, device: &str) -> AuthResult<TokenPair> {
        let claims = self
            .verification
            .verify::<RefreshClaims>(refresh_token, Some(REFRESH_AUDIENCE))?;
        let email = claims.subject.ok_or(AuthError::InvalidToken)?;
        let RefreshClaims {
            user_id,
            device: claimed_device,
        } = claims.custom;

        if claimed_device != device {
            debug!(user_id, device = %device, "Refresh token presented by another device");
            return Err(AuthError::InvalidToken);
        }

        let presented_hash = token_hash(refresh_token);
        let mut tx = self.db.pool().begin().await?;
        sessions::lock(&mut tx, user_id, device).await?;

        let Some(record) = sessions::find(&mut tx, user_id, device).await? else {
            debug!(user_id, device = %device, "No session for refresh token");
            return Err(AuthError::InvalidToken);
        };

        if !hashes_match(&presented_hash, &record.token_hash) {
            sessions::revoke(&mut tx, user_id, device).await?;
            tx.commit().await?;
            warn!(user_id, device = %device, "Refresh token reuse detected; session revoked");
            crate::metrics::record_reuse_detected();
            return Err(AuthError::InvalidToken);
        }

        let Some(account) = load_account(&mut tx, user_id).await? else {
            debug!(user_id, "Refresh for deleted account");
            return Err(AuthError::InvalidToken);
        };
        if !account.email.eq_ignore_ascii_case(&email) {
            debug!(user_id, "Refresh token subject no longer matches account");
            return Err(AuthError::InvalidToken);
        }

        let permissions = load_permissions(&mut tx, account.role_id).await?;
        let identity = Identity {
            user_id: account.id,
            email: account.email,
            role_id: account.role_id,
        };
        let minted = self.issuer.mint(&identity, device, &permissions)?;

        let replaced = sessions::replace_if_current(
            &mut tx,
            user_id,
            device,
            &record.token_hash,
            &minted.refresh_hash,
        )
        .await?;
        if !replaced {
            sessions::revoke(&mut tx, user_id, device).await?;
            tx.commit().await?;
            warn!(user_id, device = %device, "Refresh token lost a concurrent rotation; session revoked");
            crate::metrics::record_reuse_detected();
            return Err(AuthError::InvalidToken);
        }

        tx.commit().await?;
        crate::metrics::record_tokens_issued("refresh");
        info!(user_id, device = %device, "Rotated refresh token");
        Ok(minted.pair)
    }

    /// End the session of `device`. Returns whether one existed.
    pub async fn revoke(&self, user_id: i64, device: &str) -> AuthResult<bool> {
        let mut conn = self.db.pool().acquire().await?;
        let revoked = sessions::revoke(&mut conn, user_id, device).await?;
        if revoked {
            info!(user_id, device = %device, "Session revoked");
        }
        Ok(revoked)
    }
}
