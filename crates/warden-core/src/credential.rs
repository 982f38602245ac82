//! Passkey records and deactivation reasons

use serde::{Deserialize, Serialize};

use crate::crypto::PasskeyPublicKey;
use crate::types::{ActionHash, CredentialId};

/// Why a credential stopped being trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeactivationReason {
    /// Timelocked removal executed
    Removal {
        /// Key of the removal proposal
        action_hash: ActionHash,
    },

    /// Revoked wholesale by a guardian recovery that installed a new passkey
    Recovery {
        /// Nonce of the executed recovery request
        nonce: u64,
    },
}

impl core::fmt::Display for DeactivationReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DeactivationReason::Removal { action_hash } => {
                write!(f, "Removed by proposal {}", action_hash.short())
            }
            DeactivationReason::Recovery { nonce } => {
                write!(f, "Revoked by recovery #{}", nonce)
            }
        }
    }
}

/// Passkey record stored in the credential registry
///
/// Records are never deleted; a disabled credential keeps its slot so that
/// its history stays auditable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// SHA256 of the public key coordinates
    pub id: CredentialId,

    /// P-256 public key
    pub public_key: PasskeyPublicKey,

    /// Whether assertions from this passkey are accepted
    pub active: bool,

    /// Registration timestamp (informational)
    pub added_at: u64,

    /// When and why the credential was disabled
    pub deactivation: Option<(u64, DeactivationReason)>,
}

impl Credential {
    pub fn new(public_key: PasskeyPublicKey, added_at: u64) -> Self {
        Self {
            id: public_key.credential_id(),
            public_key,
            active: true,
            added_at,
            deactivation: None,
        }
    }

    /// Active with a usable key
    pub fn can_sign(&self) -> bool {
        self.active && !self.public_key.is_zero()
    }

    pub(crate) fn deactivate(&mut self, timestamp: u64, reason: DeactivationReason) {
        self.active = false;
        self.deactivation = Some((timestamp, reason));
    }
}
