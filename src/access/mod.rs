//! Capability encoding and access requirement matching.
//!
//! - [`permission`]: `ResourcePermission` and the capability-string codec
//! - [`matcher`]: compiling a route's requirements into an [`AccessMatcher`]

pub mod matcher;
pub mod permission;

pub use matcher::{AccessMatcher, compile};
pub use permission::{ResourcePermission, capability_claim, decode, decode_claim, encode};
