//! HTTP test client.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Token pair as returned by login and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Thin wrapper around a reqwest client bound to one server.
pub struct TestClient {
    base: String,
    http: reqwest::Client,
}

impl TestClient {
    pub fn new(base: String) -> Self {
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `POST /auth/login` with a raw basic credential.
    pub async fn login_raw(&self, credential: &str, device: &str) -> anyhow::Result<Response> {
        Ok(self
            .http
            .post(self.url("/auth/login"))
            .header("Authorization", format!("Basic {credential}"))
            .json(&json!({ "device": device }))
            .send()
            .await?)
    }

    pub async fn login_response(&self, email: &str, password: &str, device: &str) -> anyhow::Result<Response> {
        self.login_raw(&STANDARD.encode(format!("{email}:{password}")), device)
            .await
    }

    /// Log in and return the issued pair, failing on any non-200 response.
    pub async fn login(&self, email: &str, password: &str, device: &str) -> anyhow::Result<Tokens> {
        let response = self.login_response(email, password, device).await?;
        anyhow::ensure!(
            response.status() == StatusCode::OK,
            "login failed: {}",
            response.status()
        );
        Ok(response.json().await?)
    }

    pub async fn refresh(&self, refresh_token: &str, device: &str) -> anyhow::Result<Response> {
        Ok(self
            .http
            .post(self.url("/auth/refresh"))
            .json(&json!({ "refresh_token": refresh_token, "device": device }))
            .send()
            .await?)
    }

    pub async fn logout(&self, access_token: &str, device: &str) -> anyhow::Result<Response> {
        Ok(self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(access_token)
            .json(&json!({ "device": device }))
            .send()
            .await?)
    }

    pub async fn me(&self, access_token: Option<&str>) -> anyhow::Result<Response> {
        let mut request = self.http.get(self.url("/auth/me"));
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    pub async fn sessions(&self, access_token: &str, user_id: i64) -> anyhow::Result<Response> {
        Ok(self
            .http
            .get(self.url(&format!("/auth/sessions/{user_id}")))
            .bearer_auth(access_token)
            .send()
            .await?)
    }

    pub async fn revoke_session(&self, access_token: &str, user_id: i64, device: &str) -> anyhow::Result<Response> {
        Ok(self
            .http
            .delete(self.url(&format!("/auth/sessions/{user_id}/{device}")))
            .bearer_auth(access_token)
            .send()
            .await?)
    }

    pub async fn metrics(&self) -> anyhow::Result<String> {
        Ok(self.http.get(self.url("/metrics")).send().await?.text().await?)
    }
}

/// `WWW-Authenticate` header of a response, if any.
pub fn challenge(response: &Response) -> Option<String> {
    response
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `error` field of a JSON error body.
pub async fn error_code(response: Response) -> anyhow::Result<String> {
    let body: serde_json::Value = response.json().await?;
    Ok(body["error"].as_str().unwrap_or_default().to_string())
}
