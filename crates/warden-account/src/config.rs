//! Account configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use warden_core::{VerifierPolicy, MAX_CREDENTIALS, TIMELOCK};

use crate::error::{AccountError, Result};

/// Account configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Delay between proposing and executing removals and recoveries (seconds)
    pub timelock_secs: u64,

    /// Maximum credential records, active and inactive
    pub max_credentials: usize,

    /// Client-data and authenticator checks applied to passkey assertions
    #[serde(default)]
    pub verifier: VerifierPolicy,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            timelock_secs: TIMELOCK,
            max_credentials: MAX_CREDENTIALS,
            verifier: VerifierPolicy::default(),
        }
    }
}

impl AccountConfig {
    /// Reject settings that would make the account unusable
    pub fn validate(&self) -> Result<()> {
        if self.timelock_secs == 0 {
            return Err(AccountError::InvalidConfig(
                "timelock_secs must be positive".to_string(),
            ));
        }
        if self.max_credentials == 0 {
            return Err(AccountError::InvalidConfig(
                "max_credentials must be positive".to_string(),
            ));
        }
        if self.max_credentials > MAX_CREDENTIALS {
            return Err(AccountError::InvalidConfig(format!(
                "max_credentials must not exceed {}",
                MAX_CREDENTIALS
            )));
        }
        Ok(())
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
