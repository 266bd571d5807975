//! Client configuration. Values come from the environment with sensible
//! defaults so the demo binary runs against a local backend out of the box.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

pub const ENV_API_BASE: &str = "HMS_API_BASE";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "HMS_HTTP_TIMEOUT_SECS";
pub const ENV_AUTO_LOGIN_ON_REGISTER: &str = "HMS_AUTO_LOGIN_ON_REGISTER";

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL all endpoint paths are joined against. A trailing slash is
    /// enforced so `Url::join` keeps the final path segment.
    pub base_url: Url,
    /// Defensive bound on request duration; requests are otherwise
    /// run-to-completion (no cancellation).
    pub timeout: Duration,
    /// Whether `register` should log the new user in after a successful
    /// registration. Off by default.
    pub auto_login_on_register: bool,
}

impl ClientConfig {
    pub fn new(base: &str) -> Result<Self> {
        let base_url = parse_base(base)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            auto_login_on_register: false,
        })
    }

    /// Read configuration from HMS_* environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let base = std::env::var(ENV_API_BASE).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let timeout_secs = std::env::var(ENV_HTTP_TIMEOUT_SECS)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let auto_login = std::env::var(ENV_AUTO_LOGIN_ON_REGISTER)
            .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let base_url = parse_base(&base)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            auto_login_on_register: auto_login,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auto_login_on_register(mut self, on: bool) -> Self {
        self.auto_login_on_register = on;
        self
    }
}

fn parse_base(base: &str) -> Result<Url> {
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Url::parse(&normalized).with_context(|| format!("invalid base URL '{}'", base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let cfg = ClientConfig::new("http://localhost:8000/api").unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://localhost:8000/api/");
        // joins keep the /api segment
        let joined = cfg.base_url.join("token/").unwrap();
        assert_eq!(joined.as_str(), "http://localhost:8000/api/token/");
    }

    #[test]
    fn defaults() {
        let cfg = ClientConfig::new("http://localhost:8000/api/").unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert!(!cfg.auto_login_on_register);
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(ClientConfig::new("not a url").is_err());
    }

    #[test]
    fn builders() {
        let cfg = ClientConfig::new("http://localhost:8000/api/")
            .unwrap()
            .with_timeout(Duration::from_secs(5))
            .with_auto_login_on_register(true);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert!(cfg.auto_login_on_register);
    }
}
