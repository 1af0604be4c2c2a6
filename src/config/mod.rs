//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, DatabaseConfig)
//! - [`tokens`]: Token signing configuration (TokenConfig, SigningAlgorithm)
//! - [`validation`]: Startup validation collecting every problem found

mod tokens;
mod types;
pub mod validation;

pub use tokens::{SigningAlgorithm, TokenConfig, is_default_secret};
pub use types::{Config, ConfigError, DatabaseConfig, ServerConfig};
pub use validation::{ValidationError, validate};
