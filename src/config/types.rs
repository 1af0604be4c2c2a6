//! Core configuration types.

use super::tokens::TokenConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token signing configuration.
    #[serde(default)]
    pub tokens: TokenConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080").
    pub listen: SocketAddr,
    /// Realm advertised in `WWW-Authenticate` challenges.
    #[serde(default = "default_realm")]
    pub realm: String,
}

fn default_realm() -> String {
    "capgate".to_string()
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "capgate.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningAlgorithm;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [server]
            listen = "127.0.0.1:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.realm, "capgate");
        assert_eq!(config.database.path, "capgate.db");
        assert_eq!(config.tokens.algorithm, SigningAlgorithm::Hs256);
        assert_eq!(config.tokens.access_ttl_secs, 86_400);
        assert_eq!(config.tokens.refresh_ttl_secs, 2_592_000);
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [server]
            listen = "0.0.0.0:9000"
            realm = "tenants"

            [database]
            path = "/var/lib/capgate/auth.db"

            [tokens]
            issuer = "auth.example.com"
            algorithm = "ed25519"
            private_key_path = "/etc/capgate/signing.pem"
            access_ttl_secs = 600
            refresh_ttl_secs = 86400
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen.port(), 9000);
        assert_eq!(config.server.realm, "tenants");
        assert_eq!(config.tokens.issuer, "auth.example.com");
        assert_eq!(config.tokens.algorithm, SigningAlgorithm::Ed25519);
        assert_eq!(
            config.tokens.private_key_path.as_deref(),
            Some("/etc/capgate/signing.pem")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capgate.toml");
        std::fs::write(
            &path,
            "[server]\nlisten = \"127.0.0.1:0\"\n[tokens]\nsecret = \"0123456789abcdef0123456789abcdef\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.tokens.secret.as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/capgate.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_unknown_algorithm() {
        let err = Config::parse(
            "[server]\nlisten = \"127.0.0.1:0\"\n[tokens]\nalgorithm = \"rs256\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
