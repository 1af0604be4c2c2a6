//! Access/refresh token pair issuance.

use super::claims::{AccessClaims, REFRESH_AUDIENCE, RefreshClaims};
use super::keys::SigningContext;
use super::{Identity, TokenPair};
use crate::access::{ResourcePermission, capability_claim};
use crate::db::{Database, DbError, sessions};
use crate::error::AuthResult;
use crate::security::token_hash;
use jwt_simple::prelude::{Claims, Duration};
use std::sync::Arc;
use tracing::{debug, info};

/// Default access token lifetime.
pub const DEFAULT_ACCESS_TTL: std::time::Duration = std::time::Duration::from_secs(86_400);

/// Default refresh token lifetime.
pub const DEFAULT_REFRESH_TTL: std::time::Duration = std::time::Duration::from_secs(30 * 86_400);

/// A signed pair plus the digest of its refresh token, not yet persisted.
pub struct MintedPair {
    pub pair: TokenPair,
    pub refresh_hash: String,
}

/// Signs token pairs and records the refresh token of each (user, device).
#[derive(Clone)]
pub struct TokenIssuer {
    signing: Arc<SigningContext>,
    db: Database,
    access_ttl: std::time::Duration,
    refresh_ttl: std::time::Duration,
}

impl TokenIssuer {
    pub fn new(signing: Arc<SigningContext>, db: Database) -> Self {
        Self {
            signing,
            db,
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }

    pub fn with_ttls(mut self, access: std::time::Duration, refresh: std::time::Duration) -> Self {
        self.access_ttl = access;
        self.refresh_ttl = refresh;
        self
    }

    /// Sign a new pair without touching storage.
    ///
    /// Every token gets a random `jti`, so two pairs minted for the same
    /// identity and device within one second still differ.
    pub fn mint(
        &self,
        identity: &Identity,
        device: &str,
        permissions: &[ResourcePermission],
    ) -> AuthResult<MintedPair> {
        let capabilities = capability_claim(permissions)?;

        let access = Claims::with_custom_claims(
            AccessClaims {
                user_id: identity.user_id,
                role_id: identity.role_id,
            },
            Duration::from_secs(self.access_ttl.as_secs()),
        )
        .with_subject(&identity.email)
        .with_audience(&capabilities)
        .with_jwt_id(uuid::Uuid::new_v4());

        let refresh = Claims::with_custom_claims(
            RefreshClaims {
                user_id: identity.user_id,
                device: device.to_string(),
            },
            Duration::from_secs(self.refresh_ttl.as_secs()),
        )
        .with_subject(&identity.email)
        .with_audience(REFRESH_AUDIENCE)
        .with_jwt_id(uuid::Uuid::new_v4());

        let access_token = self.signing.sign(access)?;
        let refresh_token = self.signing.sign(refresh)?;
        let refresh_hash = token_hash(&refresh_token);

        Ok(MintedPair {
            pair: TokenPair {
                access_token,
                refresh_token,
            },
            refresh_hash,
        })
    }

    /// Issue a pair for `identity` on `device`, replacing any refresh token
    /// previously issued to that device.
    pub async fn issue(
        &self,
        identity: &Identity,
        device: &str,
        permissions: &[ResourcePermission],
    ) -> AuthResult<TokenPair> {
        let minted = self.mint(identity, device, permissions)?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        sessions::upsert(&mut tx, identity.user_id, device, &minted.refresh_hash).await?;
        tx.commit().await.map_err(DbError::from)?;

        crate::metrics::record_tokens_issued("login");
        info!(user_id = identity.user_id, device = %device, "Issued token pair");
        Ok(minted.pair)
    }

    /// Issue a pair using the current grants of the identity's role.
    pub async fn issue_for_role(&self, identity: &Identity, device: &str) -> AuthResult<TokenPair> {
        let permissions = self.db.roles().permissions(identity.role_id).await?;
        debug!(
            user_id = identity.user_id,
            role_id = identity.role_id,
            grants = permissions.len(),
            "Loaded role grants"
        );
        self.issue(identity, device, &permissions).await
    }
}
