//! Session management for the BI API.
//!
//! Logs in with stored credentials and caches the returned token for a bounded
//! time. The TTL is configured shorter than the server's own expiry so the
//! token is refreshed before the server starts rejecting it.

use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{ApiRequest, Transport, SESSION_PATH};
use crate::cache::{Cached, Stored};
use crate::clock::Clock;
use crate::error::{truncate_detail, DashError, Result};

/// Login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Creates a credentials pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: Option<String>,
}

/// Owns the session token and its cache window.
///
/// Concurrent callers serialize on one async mutex, so a burst of requests
/// within the cache window triggers a single login.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    credentials: Credentials,
    ttl: Duration,
    cached: Mutex<Option<Cached<String>>>,
    logins: AtomicUsize,
}

impl SessionManager {
    /// Creates a session manager. No login happens until the first `acquire_session`.
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        credentials: Credentials,
        ttl: Duration,
    ) -> Self {
        Self {
            transport,
            clock,
            credentials,
            ttl,
            cached: Mutex::new(None),
            logins: AtomicUsize::new(0),
        }
    }

    /// Returns a valid session token, logging in if the cached one is missing or stale.
    pub async fn acquire_session(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = self.clock.now();

        if let Some(token) = cached.as_ref().and_then(|c| c.get(now)) {
            return Ok(token.clone());
        }

        if cached.is_some() {
            debug!("Session token expired, logging in again");
        }
        *cached = None;

        let token = self.login().await?;
        *cached = Some(Cached::new(token.clone(), self.clock.now(), self.ttl));
        Ok(token)
    }

    /// Clears the cached token so the next `acquire_session` logs in again.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        if cached.take().is_some() {
            debug!("Session token invalidated");
        }
    }

    /// Seeds the token cache with a token saved by an earlier run.
    ///
    /// A stale saved token is ignored. Returns true if the token was taken.
    pub async fn restore(&self, saved: Stored<String>) -> bool {
        let mut cached = self.cached.lock().await;
        match Cached::from_stored(saved, self.ttl, self.clock.now(), self.clock.now_utc()) {
            Some(entry) => {
                debug!("Reusing saved session token");
                *cached = Some(entry);
                true
            }
            None => false,
        }
    }

    /// The cached token in saved form, if it is still fresh.
    pub async fn snapshot(&self) -> Option<Stored<String>> {
        let cached = self.cached.lock().await;
        let now = self.clock.now();
        cached
            .as_ref()
            .filter(|c| c.is_fresh(now))
            .map(|c| c.to_stored(now, self.clock.now_utc()))
    }

    /// Number of login calls made so far.
    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// Username the session is opened for.
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    async fn login(&self) -> Result<String> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        info!("Logging in to BI API as {}", self.credentials.username);

        let request = ApiRequest::post(
            SESSION_PATH,
            json!({
                "username": self.credentials.username,
                "password": self.credentials.password,
            }),
        );

        let response = self.transport.send(request).await.map_err(|e| {
            warn!("Login request failed: {}", e);
            DashError::authentication(format!("login endpoint unreachable: {}", e))
        })?;

        if !response.is_success() {
            warn!("Login rejected with HTTP {}", response.status);
            return Err(match response.status {
                400 | 401 | 403 => DashError::authentication(format!(
                    "invalid credentials for '{}' (HTTP {})",
                    self.credentials.username, response.status
                )),
                status => DashError::authentication(format!(
                    "login failed (HTTP {}): {}",
                    status,
                    truncate_detail(&response.body)
                )),
            });
        }

        let parsed: SessionResponse = serde_json::from_str(&response.body).map_err(|e| {
            DashError::authentication(format!("unreadable login response: {}", e))
        })?;

        parsed
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DashError::authentication("login response did not contain a session id"))
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("credentials", &self.credentials)
            .field("ttl", &self.ttl)
            .field("logins", &self.login_count())
            .finish()
    }
}
