//! Integration test common infrastructure.
//!
//! Provides an in-process test server with seeded accounts and an HTTP
//! client with helpers for each endpoint.

#![allow(dead_code)]

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::{TestClient, Tokens, challenge, error_code};
#[allow(unused_imports)]
pub use server::TestServer;
