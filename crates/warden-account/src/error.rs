//! Error types for the Warden account engine

use std::path::PathBuf;
use thiserror::Error;
use warden_core::ErrorKind;

/// Result type alias for account operations
pub type Result<T> = std::result::Result<T, AccountError>;

/// Errors that can occur in account operations
#[derive(Debug, Error)]
pub enum AccountError {
    /// Authorization engine error
    #[error("Core error: {0}")]
    Core(#[from] warden_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration rejected by `AccountConfig::validate`
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No saved account state at the storage path
    #[error("Account not initialized at {0}")]
    NotInitialized(PathBuf),
}

impl AccountError {
    /// Kind of the underlying authorization error, if this is one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AccountError::Core(e) => Some(e.kind()),
            AccountError::Serialization(_) => Some(ErrorKind::Serialization),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AccountError {
    fn from(e: serde_json::Error) -> Self {
        AccountError::Serialization(e.to_string())
    }
}
