//! Security primitives for capgate.
//!
//! - **Password**: Argon2id hashing for account credentials
//! - **Token hashing**: SHA-256 digests of refresh tokens and their
//!   constant-time comparison

pub mod password;
pub mod token_hash;

pub use token_hash::{hashes_match, token_hash};
