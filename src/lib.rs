//! capgate - capability-encoded access tokens with refresh rotation.
//!
//! Access tokens carry a sorted `resource:read resource:write` claim that each
//! route tests against a compiled [`access::AccessMatcher`]. Refresh tokens
//! rotate on every use and a replayed one revokes its device session.

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics;
pub mod security;
pub mod telemetry;

pub use error::{AuthError, AuthResult};
