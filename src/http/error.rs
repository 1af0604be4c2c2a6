//! Mapping of [`AuthError`] onto HTTP responses.

use crate::error::AuthError;
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::sync::Arc;

/// Which step of a request failed. Picks the challenge scheme and the
/// metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Basic-auth login.
    Credential,
    /// Bearer access token on a protected route.
    Token,
    /// Refresh token exchange.
    Refresh,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Token => "token",
            Self::Refresh => "refresh",
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            Self::Credential => "Basic",
            Self::Token | Self::Refresh => "Bearer",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: &'static str,
}

/// An [`AuthError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError {
    pub error: AuthError,
    pub stage: Stage,
    realm: Arc<str>,
}

impl ApiError {
    pub fn new(error: AuthError, stage: Stage, realm: Arc<str>) -> Self {
        Self {
            error,
            stage,
            realm,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            AuthError::MalformedCredential
            | AuthError::MissingPassword
            | AuthError::InvalidEmailFormat => StatusCode::BAD_REQUEST,
            AuthError::UnknownIdentity
            | AuthError::WrongPassword
            | AuthError::MissingToken
            | AuthError::TokenExpired
            | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::AccessDenied => StatusCode::FORBIDDEN,
            AuthError::DuplicateResource(_)
            | AuthError::Signing(_)
            | AuthError::Database(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `WWW-Authenticate` value, if the response carries one.
    pub fn challenge(&self) -> Option<String> {
        let realm = &self.realm;
        match self.error {
            AuthError::UnknownIdentity | AuthError::WrongPassword => {
                Some(format!("Basic realm=\"{realm}\""))
            }
            AuthError::MissingToken => Some(format!("{} realm=\"{realm}\"", self.stage.scheme())),
            AuthError::TokenExpired | AuthError::InvalidToken => Some(format!(
                "Bearer realm=\"{realm}\", error=\"invalid_token\", error_description=\"{}\"",
                self.error.public_message()
            )),
            AuthError::AccessDenied => Some(format!(
                "Bearer realm=\"{realm}\", error=\"insufficient_scope\""
            )),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error.error_code();
        crate::metrics::record_auth_failure(self.stage.as_str(), code);

        if status.is_server_error() {
            tracing::error!(stage = self.stage.as_str(), error = %self.error, "Request failed");
        } else {
            tracing::debug!(stage = self.stage.as_str(), error = code, "Request rejected");
        }

        let body = Json(ErrorBody {
            error: code,
            message: self.error.public_message(),
        });
        let mut response = (status, body).into_response();
        if let Some(challenge) = self.challenge()
            && let Ok(value) = HeaderValue::from_str(&challenge)
        {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}
