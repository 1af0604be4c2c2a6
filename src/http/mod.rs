//! HTTP surface: login, refresh, logout, introspection and metrics.
//!
//! Handlers authorize explicitly through the [`RouteAccess`] of their route;
//! there is no middleware that stashes identities in request extensions.

mod error;
mod gate;
mod routes;

pub use error::{ApiError, Stage};
pub use gate::{RouteAccess, basic_credential, bearer_token};

use crate::access::ResourcePermission;
use crate::auth::{CredentialVerifier, RefreshRotator, SigningContext, TokenIssuer, TokenVerifier};
use crate::config::Config;
use crate::db::Database;
use crate::error::{AuthError, AuthResult};
use axum::Router;
use axum::routing::{delete, get, post};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Declared requirements of the protected routes.
#[derive(Debug, Clone)]
pub struct Routes {
    pub me: RouteAccess,
    pub logout: RouteAccess,
    pub list_sessions: RouteAccess,
    pub revoke_session: RouteAccess,
}

impl Routes {
    fn declare(verifier: &TokenVerifier) -> AuthResult<Self> {
        Ok(Self {
            me: RouteAccess::new("me", Vec::new(), verifier.clone())?,
            logout: RouteAccess::new("logout", Vec::new(), verifier.clone())?,
            list_sessions: RouteAccess::new(
                "list_sessions",
                vec![ResourcePermission::read("sessions")],
                verifier.clone(),
            )?,
            revoke_session: RouteAccess::new(
                "revoke_session",
                vec![ResourcePermission::write("sessions")],
                verifier.clone(),
            )?,
        })
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub credentials: CredentialVerifier,
    pub issuer: TokenIssuer,
    pub verifier: TokenVerifier,
    pub rotator: RefreshRotator,
    pub routes: Arc<Routes>,
    realm: Arc<str>,
}

impl AppState {
    /// Wire the core components together and compile every route declaration.
    pub fn new(
        db: Database,
        signing: Arc<SigningContext>,
        realm: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> AuthResult<Self> {
        let verification = Arc::new(signing.verification_context());
        let verifier = TokenVerifier::new(verification.clone());
        let issuer = TokenIssuer::new(signing, db.clone()).with_ttls(access_ttl, refresh_ttl);
        let rotator = RefreshRotator::new(issuer.clone(), verification, db.clone());
        let routes = Routes::declare(&verifier)?;

        Ok(Self {
            db,
            credentials: CredentialVerifier::new(),
            issuer,
            verifier,
            rotator,
            routes: Arc::new(routes),
            realm: Arc::from(realm),
        })
    }

    pub fn from_config(db: Database, signing: Arc<SigningContext>, config: &Config) -> AuthResult<Self> {
        Self::new(
            db,
            signing,
            &config.server.realm,
            Duration::from_secs(config.tokens.access_ttl_secs),
            Duration::from_secs(config.tokens.refresh_ttl_secs),
        )
    }

    pub(crate) fn reject(&self, error: AuthError, stage: Stage) -> ApiError {
        ApiError::new(error, stage, self.realm.clone())
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(routes::login))
        .route("/auth/refresh", post(routes::refresh))
        .route("/auth/logout", post(routes::logout))
        .route("/auth/me", get(routes::me))
        .route("/auth/sessions/:user_id", get(routes::list_sessions))
        .route("/auth/sessions/:user_id/:device", delete(routes::revoke_session))
        .route("/metrics", get(routes::metrics))
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(addr = ?addr, "HTTP server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
