//! Unified client error model and display-message extraction.
//! Every HTTP exchange is classified into one of these variants immediately
//! after the call returns; call sites never inspect raw transport errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiError {
    /// Request never reached the server (connect failure, timeout, DNS).
    #[error("network error: {message}")]
    Network { message: String },
    /// 401-class response; drives the refresh-and-retry policy.
    #[error("authorization failed (HTTP {status}): {message}")]
    Authorization { status: u16, message: String },
    /// Other 4xx with a structured body; surfaced verbatim, never
    /// invalidates the session.
    #[error("validation failed")]
    Validation { fields: Value },
    /// 5xx or an unparseable failure body.
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
}

impl ApiError {
    pub fn network<S: Into<String>>(msg: S) -> Self {
        ApiError::Network { message: msg.into() }
    }

    pub fn authorization<S: Into<String>>(status: u16, msg: S) -> Self {
        ApiError::Authorization { status, message: msg.into() }
    }

    pub fn validation(fields: Value) -> Self {
        ApiError::Validation { fields }
    }

    pub fn server<S: Into<String>>(status: u16, msg: S) -> Self {
        ApiError::Server { status, message: msg.into() }
    }

    /// HTTP status carried by the variant, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Authorization { status, .. } | ApiError::Server { status, .. } => {
                Some(*status)
            }
            ApiError::Network { .. } | ApiError::Validation { .. } => None,
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, ApiError::Authorization { .. })
    }

    /// Classify a non-success HTTP response by status and (already read) body.
    /// 401 -> Authorization, other 4xx with a JSON object body -> Validation,
    /// everything else -> Server.
    pub fn from_response(status: u16, body: Option<Value>) -> Self {
        match status {
            401 => {
                let msg = body
                    .as_ref()
                    .map(extract_message)
                    .unwrap_or_else(|| "unauthorized".to_string());
                ApiError::authorization(status, msg)
            }
            400..=499 => match body {
                Some(v @ Value::Object(_)) => ApiError::validation(v),
                Some(other) => ApiError::server(status, other.to_string()),
                None => ApiError::server(status, "request failed"),
            },
            _ => {
                let msg = body
                    .as_ref()
                    .map(extract_message)
                    .unwrap_or_else(|| "request failed".to_string());
                ApiError::server(status, msg)
            }
        }
    }

    /// Human-readable message for display. Validation bodies go through the
    /// extraction policy: top-level "detail"/"message", else flattened field
    /// errors, else a generic fallback.
    pub fn display_message(&self) -> String {
        match self {
            ApiError::Network { .. } => "Network error. Please try again.".to_string(),
            ApiError::Authorization { message, .. } => message.clone(),
            ApiError::Validation { fields } => extract_message(fields),
            ApiError::Server { .. } => "Request failed. Please try again later.".to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        // Anything that produced no HTTP status is a transport failure.
        match err.status() {
            Some(s) if s.as_u16() == 401 => ApiError::authorization(401, err.to_string()),
            Some(s) => ApiError::server(s.as_u16(), err.to_string()),
            None => ApiError::network(err.to_string()),
        }
    }
}

/// Extraction policy for server error payloads, in order of preference:
/// (a) a top-level "detail" or "message" string field;
/// (b) all other field values flattened (arrays joined by spaces, scalars
///     stringified) and joined with "; ";
/// (c) a generic fallback.
pub fn extract_message(body: &Value) -> String {
    if let Some(obj) = body.as_object() {
        for key in ["detail", "message"] {
            if let Some(s) = obj.get(key).and_then(|v| v.as_str()) {
                return s.to_string();
            }
        }
        let mut parts: Vec<String> = Vec::new();
        for (_k, v) in obj.iter() {
            match v {
                Value::Array(items) => {
                    let joined = items
                        .iter()
                        .map(flatten_scalar)
                        .collect::<Vec<_>>()
                        .join(" ");
                    if !joined.is_empty() {
                        parts.push(joined);
                    }
                }
                other => {
                    let s = flatten_scalar(other);
                    if !s.is_empty() {
                        parts.push(s);
                    }
                }
            }
        }
        if !parts.is_empty() {
            return parts.join("; ");
        }
    } else if let Some(s) = body.as_str() {
        if !s.is_empty() {
            return s.to_string();
        }
    }
    "Request failed. Please try again.".to_string()
}

fn flatten_scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
