//! hms-client
//! ----------
//! Client SDK for the hospital-management REST API. Owns the session/token
//! lifecycle and the authorized request pipeline:
//! - a persistent session store (access token, refresh token, cached user);
//! - an authenticated request client with bearer injection and a single
//!   401-triggered refresh-and-retry cycle per original request;
//! - a session controller exposing login/register/logout/init and the
//!   observable state a route guard consumes.

pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use session::{AuthState, Role, Session, SessionController, SessionStore, User};
