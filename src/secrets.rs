//! Password storage in the OS keyring.
//!
//! The keyring is the external secret store the API password is read from when
//! neither the config file nor the environment provides one.

use keyring::Entry;
use tracing::{debug, warn};

use crate::error::{DashError, Result};

const SERVICE_NAME: &str = "bi-dash";

/// Keyring-backed password store, one entry per API account.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretStore;

impl SecretStore {
    /// Creates a secret store handle.
    pub fn new() -> Self {
        Self
    }

    /// Stores the password for an API account.
    pub fn store_password(&self, username: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, &Self::account_key(username))
            .map_err(|e| DashError::config(format!("Failed to create keyring entry: {e}")))?;

        entry
            .set_password(password)
            .map_err(|e| DashError::config(format!("Failed to store password: {e}")))?;

        debug!("Stored password for {} in keyring", username);
        Ok(())
    }

    /// Retrieves the password for an API account, if one is stored.
    ///
    /// An unavailable keyring counts as "not stored" and is only logged.
    pub fn retrieve_password(&self, username: &str) -> Option<String> {
        let entry = match Entry::new(SERVICE_NAME, &Self::account_key(username)) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Keyring unavailable: {e}");
                return None;
            }
        };

        match entry.get_password() {
            Ok(secret) => Some(secret),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!("Failed to read password from keyring: {e}");
                None
            }
        }
    }

    /// Deletes a stored password. Missing entries are not an error.
    pub fn delete_password(&self, username: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, &Self::account_key(username))
            .map_err(|e| DashError::config(format!("Failed to access keyring: {e}")))?;

        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(DashError::config(format!("Failed to delete password: {e}"))),
        }
    }

    /// Keyring account name for an API user.
    pub fn account_key(username: &str) -> String {
        format!("api:{}", username)
    }
}
