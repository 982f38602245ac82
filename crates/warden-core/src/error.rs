//! Error types for Warden account authorization

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure leaves account state unchanged; none is retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Action already terminal: {0}")]
    AlreadyTerminal(String),

    #[error("Action not yet executable: {0}")]
    NotYetExecutable(String),

    #[error("Action already pending: {0}")]
    AlreadyPending(String),

    #[error("Credential already registered: {0}")]
    DuplicateCredential(String),

    #[error("Credential registry full ({0} records)")]
    RegistryFull(usize),

    #[error("Cannot remove the last active credential")]
    LastCredential,

    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Invalid threshold {threshold} for {guardians} guardians")]
    InvalidThreshold { threshold: usize, guardians: usize },

    #[error("Guardian already registered: {0}")]
    DuplicateGuardian(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Stable, payload-free classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    MalformedSignature,
    NotFound,
    AlreadyTerminal,
    NotYetExecutable,
    AlreadyPending,
    DuplicateCredential,
    RegistryFull,
    LastCredential,
    InvalidKey,
    InvalidThreshold,
    DuplicateGuardian,
    InvalidAddress,
    InvalidRequest,
    Serialization,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::MalformedSignature(_) => ErrorKind::MalformedSignature,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AlreadyTerminal(_) => ErrorKind::AlreadyTerminal,
            Error::NotYetExecutable(_) => ErrorKind::NotYetExecutable,
            Error::AlreadyPending(_) => ErrorKind::AlreadyPending,
            Error::DuplicateCredential(_) => ErrorKind::DuplicateCredential,
            Error::RegistryFull(_) => ErrorKind::RegistryFull,
            Error::LastCredential => ErrorKind::LastCredential,
            Error::InvalidKey(_) => ErrorKind::InvalidKey,
            Error::InvalidThreshold { .. } => ErrorKind::InvalidThreshold,
            Error::DuplicateGuardian(_) => ErrorKind::DuplicateGuardian,
            Error::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
