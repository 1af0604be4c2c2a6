//! Per-route capability checks.
//!
//! Each protected route owns a [`RouteAccess`] compiled once when the router
//! is built. Handlers call [`RouteAccess::authorize`] with the request
//! headers and get the caller's identity back.

use crate::access::{AccessMatcher, ResourcePermission, compile};
use crate::auth::{Identity, TokenVerifier, VerifiedAccess};
use crate::error::{AuthError, AuthResult};
use axum::http::{HeaderMap, header};
use std::sync::Arc;

/// Compiled access requirement of one route.
#[derive(Clone)]
pub struct RouteAccess {
    name: &'static str,
    matcher: Arc<AccessMatcher>,
    verifier: TokenVerifier,
}

impl std::fmt::Debug for RouteAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteAccess")
            .field("name", &self.name)
            .field("pattern", &self.matcher.pattern())
            .finish()
    }
}

impl RouteAccess {
    /// Compile `requirements` for the route `name`.
    ///
    /// Fails with `DuplicateResource` if two requirements name one resource.
    pub fn new(
        name: &'static str,
        requirements: Vec<ResourcePermission>,
        verifier: TokenVerifier,
    ) -> AuthResult<Self> {
        let matcher = compile(requirements)?;
        Ok(Self {
            name,
            matcher: Arc::new(matcher),
            verifier,
        })
    }

    /// Verify the bearer token in `headers` against this route.
    pub fn authorize(&self, headers: &HeaderMap) -> AuthResult<Identity> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        self.verifier.verify(token, &self.matcher)
    }

    /// Like [`authorize`](Self::authorize), also returning the capability claim.
    pub fn authorize_access(&self, headers: &HeaderMap) -> AuthResult<VerifiedAccess> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        let access = self.verifier.verify_claims(token)?;
        if !self.matcher.test(&access.capabilities) {
            return Err(AuthError::AccessDenied);
        }
        Ok(access)
    }
}

fn authorization<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (given, rest) = value.split_once(' ')?;
    if !given.eq_ignore_ascii_case(scheme) {
        return None;
    }
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    authorization(headers, "Bearer")
}

/// Encoded credential from `Authorization: Basic <credential>`.
pub fn basic_credential(headers: &HeaderMap) -> Option<&str> {
    authorization(headers, "Basic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SigningContext;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn verifier() -> TokenVerifier {
        let signing = SigningContext::hs256(b"0123456789abcdef0123456789abcdef", "capgate");
        TokenVerifier::new(Arc::new(signing.verification_context()))
    }

    #[test]
    fn test_header_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(basic_credential(&headers("Basic Zm9vOmJhcg==")), Some("Zm9vOmJhcg=="));
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_duplicate_declaration_fails() {
        let err = RouteAccess::new(
            "bad",
            vec![ResourcePermission::read("a"), ResourcePermission::write("a")],
            verifier(),
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateResource(ref name) if name == "a"));
    }

    #[test]
    fn test_missing_header() {
        let route = RouteAccess::new("me", Vec::new(), verifier()).unwrap();
        assert!(matches!(
            route.authorize(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            route.authorize(&headers("Bearer nonsense")),
            Err(AuthError::InvalidToken)
        ));
    }
}
