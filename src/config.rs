//! Configuration management for bi-dash.
//!
//! Handles loading configuration from TOML files and environment variables:
//! the BI API connection, named queries, and the postal-prefix region table.

use crate::error::{DashError, Result};
use crate::query::PollSettings;
use crate::secrets::SecretStore;
use crate::session::Credentials;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure for bi-dash.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// BI API connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Named queries.
    #[serde(default)]
    pub queries: BTreeMap<String, QueryDefinition>,

    /// Postal-code digit prefix to region name. Empty means the built-in table.
    #[serde(default)]
    pub regions: BTreeMap<String, String>,
}

/// BI API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL, e.g. `https://bi.example.com/api`.
    pub base_url: Option<String>,

    /// Database identifier inside the BI tool.
    pub database_id: Option<u64>,

    /// API user.
    pub username: Option<String>,

    /// API password (prefer the keyring or BI_PASSWORD).
    pub password: Option<String>,

    /// How long a session token is reused before logging in again.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Delay between polls of a pending query.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum wait for a pending query.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// HTTP request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long query results are reused.
    #[serde(default = "default_result_cache_ttl_secs")]
    pub result_cache_ttl_secs: u64,
}

fn default_session_ttl_secs() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_result_cache_ttl_secs() -> u64 {
    600
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            database_id: None,
            username: None,
            password: None,
            session_ttl_secs: default_session_ttl_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            result_cache_ttl_secs: default_result_cache_ttl_secs(),
        }
    }
}

impl ApiConfig {
    /// Merges another config into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &ApiConfig) {
        if other.base_url.is_some() {
            self.base_url = other.base_url.clone();
        }
        if other.database_id.is_some() {
            self.database_id = other.database_id;
        }
        if other.username.is_some() {
            self.username = other.username.clone();
        }
        if other.password.is_some() {
            self.password = other.password.clone();
        }
    }

    /// Applies environment variables (BI_BASE_URL, etc.) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.base_url.is_none() {
            self.base_url = std::env::var("BI_BASE_URL").ok();
        }
        if self.database_id.is_none() {
            if let Ok(id) = std::env::var("BI_DATABASE_ID") {
                self.database_id = id.trim().parse().ok();
            }
        }
        if self.username.is_none() {
            self.username = std::env::var("BI_USERNAME").ok();
        }
        if self.password.is_none() {
            self.password = std::env::var("BI_PASSWORD").ok();
        }
    }

    /// Fills a missing password from the OS keyring.
    pub fn apply_keyring_password(&mut self, secrets: &SecretStore) {
        if self.password.is_some() {
            return;
        }
        if let Some(username) = &self.username {
            self.password = secrets.retrieve_password(username);
        }
    }

    /// Parses and validates the base URL.
    pub fn base_url(&self) -> Result<Url> {
        let raw = self
            .base_url
            .as_deref()
            .ok_or_else(|| DashError::config("API base URL is required (api.base_url or BI_BASE_URL)"))?;
        let url = Url::parse(raw)
            .map_err(|e| DashError::config(format!("Invalid base URL '{raw}': {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(DashError::config(format!(
                "Invalid scheme '{}'. Expected 'http' or 'https'",
                url.scheme()
            )));
        }
        Ok(url)
    }

    /// Returns the database identifier.
    pub fn database_id(&self) -> Result<u64> {
        self.database_id.ok_or_else(|| {
            DashError::config("Database id is required (api.database_id or BI_DATABASE_ID)")
        })
    }

    /// Returns the login credentials.
    pub fn credentials(&self) -> Result<Credentials> {
        let username = self
            .username
            .clone()
            .ok_or_else(|| DashError::config("API username is required (api.username or BI_USERNAME)"))?;
        let password = self.password.clone().ok_or_else(|| {
            DashError::config(format!(
                "No password for '{username}'. Set BI_PASSWORD or store one with `bidash login --save-password`"
            ))
        })?;
        Ok(Credentials::new(username, password))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Poll timing. A zero interval is rejected: the deadline would never
    /// be reached between polls.
    pub fn poll_settings(&self) -> Result<PollSettings> {
        if self.poll_interval_ms == 0 {
            return Err(DashError::config("api.poll_interval_ms must be greater than 0"));
        }
        Ok(PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.poll_timeout_secs),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn result_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.result_cache_ttl_secs)
    }

    /// Returns a display-safe string (no password) for UI purposes.
    pub fn display_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("?");
        let url = self.base_url.as_deref().unwrap_or("<no url>");
        match self.database_id {
            Some(id) => format!("{user} @ {url} (database {id})"),
            None => format!("{user} @ {url}"),
        }
    }
}

/// A native SQL query with the columns it needs coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// SQL text with `{{name}}` placeholders.
    pub sql: String,

    /// Columns coerced to numbers after receipt.
    #[serde(default)]
    pub numeric: Vec<String>,

    /// Column names for results that arrive without metadata.
    #[serde(default)]
    pub expected_columns: Option<Vec<String>>,
}

impl QueryDefinition {
    /// Creates a definition with no numeric columns and no fallback layout.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            numeric: Vec::new(),
            expected_columns: None,
        }
    }

    /// Sets the columns coerced to numbers.
    pub fn with_numeric<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the fallback column layout.
    pub fn with_expected_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bi-dash")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| DashError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            DashError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named query.
    pub fn get_query(&self, name: &str) -> Result<&QueryDefinition> {
        self.queries.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.queries.keys().map(String::as_str).collect();
            DashError::config(format!(
                "Query '{}' not found in config file (known: {})",
                name,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })
    }
}
