//! Authenticated request client: wraps reqwest, injects the stored bearer
//! token on every request, and on a 401 performs exactly one
//! refresh-and-retry cycle per original request.

use anyhow::{Context, Result};
use reqwest::{Method, Url};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionStore;

pub const TOKEN_PATH: &str = "token/";
pub const TOKEN_REFRESH_PATH: &str = "token/refresh/";
pub const PROFILE_PATH: &str = "profile/";
pub const REGISTER_PATH: &str = "register/";
pub const LOGOUT_PATH: &str = "auth/logout/";

pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    store: SessionStore,
    // Serializes refresh cycles across concurrent 401s; within one original
    // request the refresh-then-retry sequence is strictly ordered.
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    pub fn new(cfg: &ClientConfig, store: SessionStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            base: cfg.base_url.clone(),
            http,
            store,
            refresh_gate: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Send an authorized request. A 401 response triggers at most one
    /// refresh-and-retry; the retry's outcome is final either way.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let token = self.store.access_token();
        let original = match self
            .send_once(method.clone(), path, body, token.as_deref())
            .await
        {
            Ok(v) => return Ok(v),
            Err(e) if e.is_authorization() => e,
            Err(e) => return Err(e),
        };

        let Some(refresh) = self.store.refresh_token() else {
            // Nothing to refresh with; the original failure stands and the
            // store is left untouched.
            return Err(original);
        };

        let _gate = self.refresh_gate.lock().await;
        match self.refresh_access_token(&refresh).await {
            Ok(access) => {
                self.store.set_access_token(&access);
                debug!(target: "hms_client", "token refreshed, retrying {} {}", method, path);
                self.send_once(method, path, body, Some(&access)).await
            }
            Err(e) => {
                warn!(target: "hms_client", "token refresh failed: {}", e);
                self.store.clear();
                Err(original)
            }
        }
    }

    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.request(Method::DELETE, path, None).await
    }

    /// Bare POST used for token issue and registration: no bearer header,
    /// no refresh-and-retry.
    pub async fn post_unauthenticated(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.send_once(Method::POST, path, Some(body), None).await
    }

    /// One wire exchange, classified. No retry logic.
    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> ApiResult<Value> {
        let url = self.join(path)?;
        let mut req = self.http.request(method, url);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<Value>().await.unwrap_or(Value::Null));
        }
        let payload = resp.json::<Value>().await.ok();
        Err(ApiError::from_response(status.as_u16(), payload))
    }

    /// Exchange the refresh token for a new access token. This call bypasses
    /// bearer injection and the retry logic entirely, so a failing refresh
    /// can never recurse into another refresh.
    async fn refresh_access_token(&self, refresh: &str) -> ApiResult<String> {
        let url = self.join(TOKEN_REFRESH_PATH)?;
        let resp = self
            .http
            .post(url)
            .json(&json!({ "refresh": refresh }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let payload = resp.json::<Value>().await.ok();
            return Err(ApiError::from_response(status.as_u16(), payload));
        }
        let v = resp.json::<Value>().await.unwrap_or(Value::Null);
        match v.get("access").and_then(|a| a.as_str()) {
            Some(access) if !access.is_empty() => Ok(access.to_string()),
            _ => Err(ApiError::server(
                status.as_u16(),
                "refresh response missing access token",
            )),
        }
    }

    fn join(&self, path: &str) -> ApiResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::network(format!("invalid request path '{}': {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let cfg = ClientConfig::new("http://127.0.0.1:1/api").unwrap();
        ApiClient::new(&cfg, SessionStore::in_memory()).unwrap()
    }

    #[test]
    fn join_is_relative_to_base() {
        let c = client();
        assert_eq!(
            c.join(TOKEN_PATH).unwrap().as_str(),
            "http://127.0.0.1:1/api/token/"
        );
        // a leading slash must not strip the /api prefix
        assert_eq!(
            c.join("/profile/").unwrap().as_str(),
            "http://127.0.0.1:1/api/profile/"
        );
    }

    #[tokio::test]
    async fn unreachable_host_classifies_as_network() {
        // port 1 on loopback: connect fails fast, no HTTP status involved
        let c = client();
        let err = c.get(PROFILE_PATH).await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
    }
}
