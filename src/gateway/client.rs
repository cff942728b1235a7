use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};

/// Where the client finds the current bearer token, if any. Kept as a seam so
/// the session manager can publish tokens without owning the client.
pub trait TokenSource: Send + Sync {
    fn bearer(&self) -> Option<String>;
}

/// Shared token slot written by the session manager and read by the client.
#[derive(Clone, Default)]
pub struct TokenCell(Arc<RwLock<Option<String>>>);

impl TokenCell {
    pub fn new() -> Self { Self::default() }

    pub fn set(&self, token: Option<String>) {
        *self.0.write() = token;
    }
}

impl TokenSource for TokenCell {
    fn bearer(&self) -> Option<String> {
        self.0.read().clone()
    }
}

/// Backend auth reply shape shared by login, demo-login and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub principal_id: String,
    pub role: String,
    #[serde(default)]
    pub user_info: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub demo_mode: bool,
}

/// Thin reqwest wrapper for the companion REST backend. Injects
/// `Authorization: Bearer <token>` whenever a token is present and omits the
/// header entirely otherwise.
#[derive(Clone)]
pub struct BackendClient {
    base: String,
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl BackendClient {
    pub fn new(base: &str, tokens: Arc<dyn TokenSource>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            base: base.trim_end_matches('/').to_string(),
            http,
            tokens,
        }
    }

    pub fn base(&self) -> &str { &self.base }

    async fn request_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> AppResult<serde_json::Value> {
        let url = format!("{}{}", self.base, path);
        let mut req = self.http.request(method, &url);
        if let Some(token) = self.tokens.bearer() {
            if !token.is_empty() {
                req = req.bearer_auth(token);
            }
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let val: serde_json::Value = resp.json().await.unwrap_or_else(|_| json!({}));
        if !status.is_success() {
            // Backends put a human-readable reason in `detail`; fall back to
            // the status line when absent.
            let detail = val
                .get("detail")
                .and_then(|d| d.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("HTTP {}", status));
            let code = format!("http_{}", status.as_u16());
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                AppError::auth(code, detail)
            } else {
                AppError::transport(code, detail)
            });
        }
        Ok(val)
    }

    pub async fn get_json(&self, path: &str) -> AppResult<serde_json::Value> {
        self.request_json(reqwest::Method::GET, path, None).await
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> AppResult<serde_json::Value> {
        self.request_json(reqwest::Method::POST, path, Some(body)).await
    }

    // --- auth endpoints ---

    pub async fn login_internet_identity(&self, principal_id: &str, signature: &str) -> AppResult<AuthResponse> {
        let body = json!({ "principal_id": principal_id, "signature": signature });
        let val = self.post_json("/auth/login/internet-identity", &body).await?;
        Ok(serde_json::from_value(val)?)
    }

    pub async fn demo_login(&self, role: &str) -> AppResult<AuthResponse> {
        let val = self.post_json(&format!("/auth/demo-login/{}", role), &json!({})).await?;
        Ok(serde_json::from_value(val)?)
    }

    pub async fn refresh(&self) -> AppResult<AuthResponse> {
        let val = self.post_json("/auth/refresh", &json!({})).await?;
        Ok(serde_json::from_value(val)?)
    }

    pub async fn logout(&self) -> AppResult<()> {
        self.post_json("/auth/logout", &json!({})).await?;
        Ok(())
    }

    pub async fn profile(&self) -> AppResult<serde_json::Value> {
        self.get_json("/auth/profile").await
    }
}
