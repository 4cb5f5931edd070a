//! Access key storage for the key-authenticated values API.
//!
//! The key is looked up in the `ROLLCALL_API_KEY` environment variable first,
//! then in the OS keychain entry for the spreadsheet.

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "rollcall";

/// Environment variable that overrides the stored key
pub const API_KEY_ENV: &str = "ROLLCALL_API_KEY";

pub struct KeyStore;

impl KeyStore {
    /// Store an access key for a spreadsheet in the OS keychain
    pub fn store(sheet_id: &str, key: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, sheet_id)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(key)
            .context("Failed to store access key in keychain")?;
        Ok(())
    }

    /// Retrieve the stored access key for a spreadsheet
    pub fn get(sheet_id: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, sheet_id)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve access key from keychain")
    }

    /// Delete the stored access key for a spreadsheet
    pub fn delete(sheet_id: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, sheet_id)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete access key from keychain")?;
        Ok(())
    }

    /// Resolve the key to use: environment first, then keychain.
    pub fn resolve(sheet_id: &str) -> Option<String> {
        if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
            return Some(key.trim().to_string());
        }
        match Self::get(sheet_id) {
            Ok(key) => Some(key),
            Err(e) => {
                debug!(error = %e, "No access key in keychain");
                None
            }
        }
    }
}
