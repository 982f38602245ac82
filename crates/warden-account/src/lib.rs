//! Warden Account - Passkey account engine
//!
//! This crate drives a single account on top of `warden-core`:
//! - Request authorization through the passkey signature verifier
//! - Immediate passkey addition and timelocked removal
//! - Guardian recovery with threshold approval and timelock
//! - Guardian set management
//! - Event journal and JSON state persistence

pub mod account;
pub mod config;
pub mod error;
mod lifecycle;
mod recovery;
pub mod state;
pub mod storage;

pub use account::Account;
pub use config::AccountConfig;
pub use error::{AccountError, Result};
pub use state::{AccountState, RecoveryPayload, RemovalPayload};
pub use storage::AccountStorage;
