//! State kept between runs: session tokens and query results.
//!
//! Everything lives in one JSON file in the user cache directory, grouped by
//! API scope (user, server and database) so switching servers never serves
//! another server's rows. A file that cannot be parsed is moved aside and
//! replaced with an empty state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::cache::{ResultCache, Stored};
use crate::clock::Clock;
use crate::error::{DashError, Result};
use crate::session::SessionManager;
use crate::table::TabularResult;

/// Saved state for one API scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Stored<String>>,

    #[serde(default)]
    pub results: BTreeMap<String, Stored<TabularResult>>,
}

/// Contents of the state file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    #[serde(default)]
    pub scopes: BTreeMap<String, ScopeState>,
}

/// Reads and writes the state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the default state file path for the current platform.
    ///
    /// - Linux: `~/.cache/bi-dash/state.json`
    /// - macOS: `~/Library/Caches/bi-dash/state.json`
    /// - Windows: `%LOCALAPPDATA%\bi-dash\state.json`
    pub fn default_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| DashError::config("Could not determine cache directory"))?;
        Ok(cache_dir.join("bi-dash").join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key that separates state of different users, servers and databases.
    pub fn scope_key(base_url: &str, username: &str, database_id: u64) -> String {
        format!("{username}@{}#{database_id}", base_url.trim_end_matches('/'))
    }

    /// Loads the state file. Missing or unreadable files give an empty state.
    pub fn load(&self) -> SavedState {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return SavedState::default(),
            Err(e) => {
                warn!("Failed to read state file {}: {e}", self.path.display());
                return SavedState::default();
            }
        };

        match serde_json::from_str(&text) {
            Ok(state) => state,
            Err(e) => {
                warn!("State file {} is corrupted: {e}", self.path.display());
                self.move_aside();
                SavedState::default()
            }
        }
    }

    /// Writes the state file, replacing it atomically.
    pub fn save(&self, state: &SavedState) -> Result<()> {
        self.ensure_parent_dirs()?;
        let json = serde_json::to_string(state)
            .map_err(|e| DashError::internal(format!("Failed to encode state: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, &json)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                DashError::io(format!("Failed to write state file {}: {e}", self.path.display()))
            })?;
        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    /// Seeds `sessions` and `cache` from the saved state of `scope`.
    pub async fn restore_into(
        &self,
        scope: &str,
        sessions: Option<&SessionManager>,
        cache: Option<&ResultCache>,
        clock: &dyn Clock,
    ) {
        let Some(saved) = self.load().scopes.remove(scope) else {
            return;
        };

        if let (Some(sessions), Some(token)) = (sessions, saved.session) {
            sessions.restore(token).await;
        }
        if let Some(cache) = cache {
            let kept = cache.restore(saved.results, clock.now(), clock.now_utc());
            if kept > 0 {
                info!("Loaded {} saved query results", kept);
            }
        }
    }

    /// Saves the fresh session token and results of `scope`, keeping other scopes.
    pub async fn persist_from(
        &self,
        scope: &str,
        sessions: &SessionManager,
        cache: Option<&ResultCache>,
        clock: &dyn Clock,
    ) -> Result<()> {
        let mut state = self.load();
        let entry = ScopeState {
            session: sessions.snapshot().await,
            results: cache
                .map(|c| c.snapshot(clock.now(), clock.now_utc()))
                .unwrap_or_default(),
        };
        state.scopes.insert(scope.to_string(), entry);
        self.save(&state)
    }

    fn ensure_parent_dirs(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                DashError::io(format!(
                    "Failed to create cache directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(())
    }

    fn move_aside(&self) {
        let backup = self.path.with_extension("json.bak");
        match fs::rename(&self.path, &backup) {
            Ok(()) => warn!("Moved unreadable state to {}", backup.display()),
            Err(e) => warn!("Failed to move {} aside: {e}", self.path.display()),
        }
    }
}

/// Session tokens are credentials: the file is readable by its owner only.
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
