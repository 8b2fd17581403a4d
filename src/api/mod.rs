//! Transport layer for the BI HTTP API.
//!
//! Provides a trait-based interface for sending requests, so the session and
//! query logic can run against the real HTTP client or a scripted mock.

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::{DashError, Result};

/// Header carrying the session token on every call after login.
pub const SESSION_HEADER: &str = "X-Metabase-Session";

/// Login endpoint.
pub const SESSION_PATH: &str = "session";

/// Native query endpoint.
pub const DATASET_PATH: &str = "dataset";

/// HTTP method subset used by the BI API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Returns the method as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to the BI API, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, without a leading slash (e.g. `dataset`).
    pub path: String,
    /// Session token sent in [`SESSION_HEADER`], if any.
    pub session: Option<String>,
    /// JSON body for POST requests.
    pub body: Option<JsonValue>,
}

impl ApiRequest {
    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into().trim_start_matches('/').to_string(),
            session: None,
            body: None,
        }
    }

    /// Creates a POST request with a JSON body.
    pub fn post(path: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: Method::Post,
            path: path.into().trim_start_matches('/').to_string(),
            session: None,
            body: Some(body),
        }
    }

    /// Attaches a session token.
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session = Some(token.into());
        self
    }
}

/// Raw API response: status code and body text.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Creates a response with a text body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: &JsonValue) -> Self {
        Self::new(status, body.to_string())
    }

    /// Returns true for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON.
    pub fn parse_json(&self) -> Result<JsonValue> {
        serde_json::from_str(&self.body).map_err(|e| {
            DashError::decode(format!(
                "response body is not JSON (HTTP {}): {}",
                self.status, e
            ))
        })
    }
}

/// Trait for sending requests to the BI API.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
/// Non-2xx statuses are returned as responses, not errors; only network-level
/// failures produce `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the raw response.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}
