//! capgated - HTTP front end for capgate.

use capgate::auth::SigningContext;
use capgate::config::{Config, SigningAlgorithm, is_default_secret, validate};
use capgate::db::Database;
use capgate::http::{self, AppState};
use capgate::metrics;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("CAPGATE_LOG_JSON").is_ok() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "capgate.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "Configuration has {} error(s). See messages above.",
            errors.len()
        ));
    }

    // SECURITY: anyone holding the HS256 secret can mint tokens with any capability claim
    if config.tokens.algorithm == SigningAlgorithm::Hs256
        && let Some(ref secret) = config.tokens.secret
        && is_default_secret(secret)
    {
        if std::env::var("CAPGATE_ALLOW_INSECURE_SECRET").is_ok() {
            tracing::warn!(
                "INSECURE: Running with weak tokens.secret (allowed via CAPGATE_ALLOW_INSECURE_SECRET)"
            );
        } else {
            error!("FATAL: Insecure tokens.secret detected!");
            error!("  Set a strong secret in {}:", config_path);
            error!("    [tokens]");
            error!("    secret = \"<random 32+ byte string>\"");
            error!("  Generate one with:");
            error!("    openssl rand -hex 32");
            error!("  For testing only, set CAPGATE_ALLOW_INSECURE_SECRET=1 to bypass this check.");
            return Err(anyhow::anyhow!(
                "Refusing to start with insecure tokens.secret. See error messages above."
            ));
        }
    }

    info!(
        listen = %config.server.listen,
        issuer = %config.tokens.issuer,
        algorithm = ?config.tokens.algorithm,
        "Starting capgated"
    );

    metrics::init();

    let db = Database::new(&config.database.path).await?;
    let signing = Arc::new(SigningContext::from_config(&config.tokens)?);
    let state = AppState::from_config(db, signing, &config)?;

    let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
    http::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    })
    .await?;

    info!("capgated stopped");
    Ok(())
}
