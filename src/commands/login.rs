//! `login`: credential check and keyring management.

use tracing::info;

use crate::config::ApiConfig;
use crate::error::{DashError, Result};
use crate::secrets::SecretStore;
use crate::session::SessionManager;

/// Logs in once and optionally saves the password that worked.
pub async fn handle_login(
    sessions: &SessionManager,
    api: &ApiConfig,
    secrets: &SecretStore,
    save_password: bool,
) -> Result<String> {
    sessions.acquire_session().await?;
    info!("Login succeeded for {}", sessions.username());

    if save_password {
        let password = api
            .password
            .as_deref()
            .ok_or_else(|| DashError::config("No password to save"))?;
        secrets.store_password(sessions.username(), password)?;
    }
    Ok(login_message(api, save_password))
}

/// Confirmation printed after a successful login. Never includes the password.
pub fn login_message(api: &ApiConfig, saved: bool) -> String {
    let mut message = format!("Logged in as {}", api.display_string());
    if saved {
        message.push_str("\nStored the password in the OS keyring");
    }
    message
}

/// Removes the stored password for the configured user.
pub fn forget_password(api: &ApiConfig, secrets: &SecretStore) -> Result<String> {
    let username = api
        .username
        .as_deref()
        .ok_or_else(|| DashError::config("API username is required (api.username or BI_USERNAME)"))?;
    secrets.delete_password(username)?;
    Ok(format!("Removed stored password for {username}"))
}
