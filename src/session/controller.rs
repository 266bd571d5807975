//! Session controller: owns the observable authentication state and
//! orchestrates the session store and the authenticated request client.
//!
//! State machine: Anonymous -> Authenticating -> Authenticated |
//! AuthenticationFailed. Logout and irrecoverable refresh failure return to
//! Anonymous with all stored session data cleared.

use anyhow::Result;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::{ApiClient, LOGOUT_PATH, PROFILE_PATH, REGISTER_PATH, TOKEN_PATH};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::store::SessionStore;
use crate::session::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
    AuthenticationFailed,
}

/// Observable snapshot consumed by the UI layer and the route guard.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

struct Inner {
    state: AuthState,
    session: Session,
}

pub struct SessionController {
    client: ApiClient,
    store: SessionStore,
    auto_login_on_register: bool,
    inner: RwLock<Inner>,
}

impl SessionController {
    pub fn new(cfg: &ClientConfig, store: SessionStore) -> Result<Self> {
        let client = ApiClient::new(cfg, store.clone())?;
        Ok(Self {
            client,
            store,
            auto_login_on_register: cfg.auto_login_on_register,
            inner: RwLock::new(Inner {
                state: AuthState::Anonymous,
                session: Session::default(),
            }),
        })
    }

    pub fn state(&self) -> AuthState {
        self.inner.read().state
    }

    pub fn session(&self) -> Session {
        self.inner.read().session.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().session.is_authenticated
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.read().session.user.clone()
    }

    /// Shared client for the rest of the API surface (departments, patients,
    /// appointments, ...). Requests issued through it pick up the session's
    /// tokens automatically.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Hydrate the session from persistent storage. A stored access token is
    /// trusted optimistically, then verified by fetching the profile (which
    /// recovers an expired token via the refresh cycle). Verification failure
    /// clears everything; no partial session survives.
    pub async fn init(&self) -> Option<User> {
        let Some(access) = self.store.access_token() else {
            self.reset();
            return None;
        };
        {
            let mut inner = self.inner.write();
            inner.state = AuthState::Authenticated;
            inner.session = Session {
                access_token: Some(access),
                refresh_token: self.store.refresh_token(),
                user: self.store.user(),
                is_authenticated: true,
                is_loading: false,
                last_error: None,
            };
        }
        match self.fetch_profile().await {
            Ok(user) => {
                self.store.set_user(&user);
                let mut inner = self.inner.write();
                inner.session.user = Some(user.clone());
                inner.session.access_token = self.store.access_token();
                debug!(target: "hms_client", "session restored for {}", user.username);
                Some(user)
            }
            Err(e) => {
                debug!(target: "hms_client", "stored session rejected: {}", e);
                self.store.clear();
                self.reset();
                None
            }
        }
    }

    /// Exchange credentials for a token pair, then fetch and persist the
    /// profile. Any failure leaves the session logged out with a
    /// human-readable `last_error`.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<User> {
        {
            let mut inner = self.inner.write();
            inner.state = AuthState::Authenticating;
            inner.session.is_loading = true;
            inner.session.last_error = None;
        }
        let body = json!({ "username": username, "password": password });
        let tokens = match self.client.post_unauthenticated(TOKEN_PATH, &body).await {
            Ok(v) => v,
            Err(e) => return Err(self.fail_login(e.display_message(), e)),
        };
        let (access, refresh) = match (
            tokens.get("access").and_then(|v| v.as_str()),
            tokens.get("refresh").and_then(|v| v.as_str()),
        ) {
            (Some(a), Some(r)) if !a.is_empty() => (a.to_string(), r.to_string()),
            _ => {
                let e = ApiError::server(200, "token response missing access/refresh");
                return Err(self.fail_login("Invalid response from server".to_string(), e));
            }
        };
        self.store.set_tokens(&access, &refresh);

        let user = match self.fetch_profile().await {
            Ok(u) => u,
            Err(e) => {
                // remain logged out; drop the half-established session
                self.store.clear();
                return Err(self.fail_login(e.display_message(), e));
            }
        };
        self.store.set_user(&user);
        {
            let mut inner = self.inner.write();
            inner.state = AuthState::Authenticated;
            inner.session = Session {
                access_token: Some(access),
                refresh_token: Some(refresh),
                user: Some(user.clone()),
                is_authenticated: true,
                is_loading: false,
                last_error: None,
            };
        }
        info!(target: "hms_client", "login ok user={} role={}", user.username, user.role.as_str());
        Ok(user)
    }

    /// Create an account. Does not authenticate by itself unless
    /// `auto_login_on_register` is set and the payload carries credentials.
    pub async fn register(&self, payload: &Value) -> ApiResult<Value> {
        let created = match self.client.post_unauthenticated(REGISTER_PATH, payload).await {
            Ok(v) => v,
            Err(e) => {
                self.inner.write().session.last_error = Some(e.display_message());
                return Err(e);
            }
        };
        info!(target: "hms_client", "registration accepted");
        if self.auto_login_on_register {
            if let (Some(u), Some(p)) = (
                payload.get("username").and_then(|v| v.as_str()),
                payload.get("password").and_then(|v| v.as_str()),
            ) {
                self.login(u, p).await?;
            }
        }
        Ok(created)
    }

    /// Best-effort server logout, then unconditional local teardown. The
    /// server call's failure is swallowed; clearing always happens.
    pub async fn logout(&self) {
        if let Err(e) = self.client.post(LOGOUT_PATH, &json!({})).await {
            debug!(target: "hms_client", "server logout ignored: {}", e);
        }
        self.store.clear();
        self.reset();
        info!(target: "hms_client", "logged out");
    }

    /// Route a guard should send the current user to: the role's dashboard
    /// when authenticated, /login otherwise.
    pub fn landing_route(&self) -> &'static str {
        let inner = self.inner.read();
        match (&inner.session.user, inner.session.is_authenticated) {
            (Some(user), true) => user.role.landing_route(),
            _ => "/login",
        }
    }

    async fn fetch_profile(&self) -> ApiResult<User> {
        let v = self.client.get(PROFILE_PATH).await?;
        serde_json::from_value::<User>(v)
            .map_err(|e| ApiError::server(200, format!("malformed profile payload: {}", e)))
    }

    fn fail_login(&self, message: String, err: ApiError) -> ApiError {
        let mut inner = self.inner.write();
        inner.state = AuthState::AuthenticationFailed;
        inner.session.is_loading = false;
        inner.session.is_authenticated = false;
        inner.session.access_token = None;
        inner.session.refresh_token = None;
        inner.session.user = None;
        inner.session.last_error = Some(message);
        err
    }

    fn reset(&self) {
        let mut inner = self.inner.write();
        inner.state = AuthState::Anonymous;
        inner.session = Session::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SessionController {
        let cfg = ClientConfig::new("http://127.0.0.1:1/api").unwrap();
        SessionController::new(&cfg, SessionStore::in_memory()).unwrap()
    }

    #[test]
    fn starts_anonymous() {
        let c = controller();
        assert_eq!(c.state(), AuthState::Anonymous);
        assert!(!c.is_authenticated());
        assert_eq!(c.landing_route(), "/login");
    }

    #[tokio::test]
    async fn init_without_stored_token_stays_anonymous() {
        let c = controller();
        assert!(c.init().await.is_none());
        assert_eq!(c.state(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn logout_when_already_logged_out_is_idempotent() {
        let c = controller();
        // residual storage from a previous run
        c.store.set_tokens("stale", "stale");
        c.logout().await;
        assert_eq!(c.state(), AuthState::Anonymous);
        assert!(c.store.access_token().is_none());
        assert!(c.store.refresh_token().is_none());
        c.logout().await;
        assert_eq!(c.state(), AuthState::Anonymous);
    }
}
