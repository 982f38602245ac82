//! Warden Core - Passkey credentials, assertion verification, and timelocks
//!
//! This crate provides the building blocks of the Warden account
//! authorization engine: the credential registry, the P-256 passkey
//! signature verifier, the generic timelocked action queue, and the
//! guardian set used by social recovery.

pub mod assertion;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod events;
pub mod guardian;
pub mod registry;
pub mod timelock;
pub mod types;
pub mod verifier;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use assertion::{Assertion, AuthenticatorData, ClientData, WebAuthnAssertion};
pub use credential::{Credential, DeactivationReason};
pub use crypto::{CurveSignature, PasskeyPublicKey};
pub use error::{Error, ErrorKind, Result};
pub use events::AccountEvent;
pub use guardian::GuardianSet;
pub use registry::CredentialRegistry;
pub use timelock::{ActionStatus, PendingAction, TimelockQueue};
pub use types::{ActionHash, Address, Challenge, CredentialId};
pub use verifier::{SignatureVerifier, VerifiedAssertion, VerifierPolicy};

/// Maximum credential records per account, active and inactive
pub const MAX_CREDENTIALS: usize = 10;

/// Seconds between proposing and executing a removal or recovery (24 hours)
pub const TIMELOCK: u64 = 24 * 60 * 60;
