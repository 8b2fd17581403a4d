//! Error types for bi-dash.
//!
//! Defines the main error enum used throughout the application.

use std::time::Duration;
use thiserror::Error;

/// Maximum number of characters of a server response kept in error messages.
pub const MAX_DETAIL_CHARS: usize = 300;

/// Main error type for bi-dash operations.
#[derive(Error, Debug)]
pub enum DashError {
    /// Login failed (bad credentials, login endpoint unreachable, no token in reply).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The API rejected the session again after a fresh login.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// An asynchronous query did not finish before the poll deadline.
    #[error("Query still pending after {}s, try again later", waited.as_secs())]
    QueryPending {
        /// How long the poll loop waited.
        waited: Duration,
    },

    /// The API answered with an unexpected status code.
    #[error("Query failed (HTTP {status}): {detail}")]
    QueryFailed {
        /// HTTP status code.
        status: u16,
        /// Truncated server-provided detail.
        detail: String,
    },

    /// Expected columns are absent from a result, or a row has the wrong arity.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The response payload has an unrecognized shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Network-level failure talking to the API.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O errors (reading query files, writing exports).
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DashError {
    /// Creates an authentication error with the given message.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Creates a session-expired error with the given message.
    pub fn session_expired(msg: impl Into<String>) -> Self {
        Self::SessionExpired(msg.into())
    }

    /// Creates a query-failed error, truncating the server detail.
    pub fn query_failed(status: u16, body: &str) -> Self {
        Self::QueryFailed {
            status,
            detail: truncate_detail(body),
        }
    }

    /// Creates a schema mismatch error with the given message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an I/O error with the given message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "Authentication Error",
            Self::SessionExpired(_) => "Session Error",
            Self::QueryPending { .. } => "Query Timeout",
            Self::QueryFailed { .. } => "Query Error",
            Self::SchemaMismatch(_) => "Schema Error",
            Self::Decode(_) => "Decode Error",
            Self::Transport(_) => "Transport Error",
            Self::Config(_) => "Configuration Error",
            Self::Io(_) => "I/O Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Truncates a server response body to [`MAX_DETAIL_CHARS`] characters.
pub fn truncate_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_DETAIL_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_DETAIL_CHARS).collect();
    out.push('…');
    out
}

/// Result type alias using DashError.
pub type Result<T> = std::result::Result<T, DashError>;
