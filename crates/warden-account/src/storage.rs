//! Account storage
//!
//! Persists the account state as a single JSON document.

use std::path::{Path, PathBuf};

use crate::account::Account;
use crate::config::AccountConfig;
use crate::error::{AccountError, Result};
use crate::state::AccountState;

const STATE_FILE: &str = "account_state.json";

/// File-backed store for one account
pub struct AccountStorage {
    /// Base path for storage
    base_path: PathBuf,
}

impl AccountStorage {
    /// Create a new storage instance, creating the directory if needed
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Check if account state has been saved
    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    /// Load account state
    pub fn load(&self) -> Result<AccountState> {
        let path = self.state_path();
        if !path.exists() {
            return Err(AccountError::NotInitialized(path));
        }

        let content = std::fs::read_to_string(&path)?;
        let state: AccountState = serde_json::from_str(&content)?;
        Ok(state)
    }

    /// Save account state
    pub fn save(&self, state: &AccountState) -> Result<()> {
        let path = self.state_path();
        let content = serde_json::to_string_pretty(state)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &path)?;

        Ok(())
    }

    /// Load state and resume the account under `config`
    pub fn open(&self, config: AccountConfig) -> Result<Account> {
        Account::from_state(config, self.load()?)
    }

    fn state_path(&self) -> PathBuf {
        self.base_path.join(STATE_FILE)
    }
}
