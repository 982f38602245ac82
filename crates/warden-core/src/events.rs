//! Events emitted by committed account operations
//!
//! Indexers and UIs consume these; an event exists only if the call that
//! produced it succeeded.

use serde::{Deserialize, Serialize};

use crate::credential::DeactivationReason;
use crate::crypto::PasskeyPublicKey;
use crate::types::{ActionHash, Address, CredentialId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AccountEvent {
    CredentialAdded {
        credential_id: CredentialId,
        public_key: PasskeyPublicKey,
        timestamp: u64,
    },
    CredentialDeactivated {
        credential_id: CredentialId,
        reason: DeactivationReason,
        timestamp: u64,
    },
    RemovalProposed {
        action_hash: ActionHash,
        credential_id: CredentialId,
        proposed_by: CredentialId,
        timestamp: u64,
    },
    RemovalExecuted {
        action_hash: ActionHash,
        credential_id: CredentialId,
        timestamp: u64,
    },
    RemovalCancelled {
        action_hash: ActionHash,
        cancelled_by: CredentialId,
        timestamp: u64,
    },
    RecoveryProposed {
        nonce: u64,
        proposer: Address,
        new_owner: Option<Address>,
        new_credential: Option<CredentialId>,
        timestamp: u64,
    },
    RecoveryApproved {
        nonce: u64,
        guardian: Address,
        approvals: usize,
        timestamp: u64,
    },
    RecoveryExecuted {
        nonce: u64,
        timestamp: u64,
    },
    RecoveryCancelled {
        nonce: u64,
        cancelled_by: CredentialId,
        timestamp: u64,
    },
    OwnerChanged {
        previous: Address,
        new_owner: Address,
        timestamp: u64,
    },
    GuardianAdded {
        guardian: Address,
        timestamp: u64,
    },
    GuardianRemoved {
        guardian: Address,
        timestamp: u64,
    },
    ThresholdChanged {
        threshold: usize,
        timestamp: u64,
    },
}

impl AccountEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            AccountEvent::CredentialAdded { .. } => "credential_added",
            AccountEvent::CredentialDeactivated { .. } => "credential_deactivated",
            AccountEvent::RemovalProposed { .. } => "removal_proposed",
            AccountEvent::RemovalExecuted { .. } => "removal_executed",
            AccountEvent::RemovalCancelled { .. } => "removal_cancelled",
            AccountEvent::RecoveryProposed { .. } => "recovery_proposed",
            AccountEvent::RecoveryApproved { .. } => "recovery_approved",
            AccountEvent::RecoveryExecuted { .. } => "recovery_executed",
            AccountEvent::RecoveryCancelled { .. } => "recovery_cancelled",
            AccountEvent::OwnerChanged { .. } => "owner_changed",
            AccountEvent::GuardianAdded { .. } => "guardian_added",
            AccountEvent::GuardianRemoved { .. } => "guardian_removed",
            AccountEvent::ThresholdChanged { .. } => "threshold_changed",
        }
    }

    /// Timestamp carried by every event
    pub fn timestamp(&self) -> u64 {
        match self {
            AccountEvent::CredentialAdded { timestamp, .. }
            | AccountEvent::CredentialDeactivated { timestamp, .. }
            | AccountEvent::RemovalProposed { timestamp, .. }
            | AccountEvent::RemovalExecuted { timestamp, .. }
            | AccountEvent::RemovalCancelled { timestamp, .. }
            | AccountEvent::RecoveryProposed { timestamp, .. }
            | AccountEvent::RecoveryApproved { timestamp, .. }
            | AccountEvent::RecoveryExecuted { timestamp, .. }
            | AccountEvent::RecoveryCancelled { timestamp, .. }
            | AccountEvent::OwnerChanged { timestamp, .. }
            | AccountEvent::GuardianAdded { timestamp, .. }
            | AccountEvent::GuardianRemoved { timestamp, .. }
            | AccountEvent::ThresholdChanged { timestamp, .. } => *timestamp,
        }
    }
}
