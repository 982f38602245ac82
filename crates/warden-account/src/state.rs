//! Durable account state
//!
//! Everything an account must remember between calls. Persisted as a whole
//! by [`crate::storage::AccountStorage`].

use serde::{Deserialize, Serialize};
use warden_core::{
    ActionHash, Address, CredentialId, CredentialRegistry, GuardianSet, PasskeyPublicKey,
    TimelockQueue,
};

/// Payload of a timelocked credential removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalPayload {
    /// Credential to deactivate
    pub credential_id: CredentialId,

    /// Credential whose signature authorized the proposal
    pub proposed_by: CredentialId,
}

/// Payload of a guardian recovery request
///
/// At least one of `new_owner` and `new_credential` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPayload {
    /// Guardian that opened the request
    pub proposer: Address,

    /// Replacement owner address
    pub new_owner: Option<Address>,

    /// Passkey that becomes the only active credential
    pub new_credential: Option<PasskeyPublicKey>,
}

pub type RemovalQueue = TimelockQueue<ActionHash, RemovalPayload>;
pub type RecoveryQueue = TimelockQueue<u64, RecoveryPayload>;

/// Account state owned exclusively by one account instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Current owner, implicitly a guardian
    pub owner: Address,

    pub guardians: GuardianSet,

    pub registry: CredentialRegistry,

    /// Removal proposals keyed by `SHA256(credential id || proposed_at)`
    pub removals: RemovalQueue,

    /// Recovery requests keyed by nonce
    pub recoveries: RecoveryQueue,

    /// Nonce the next recovery request will use
    pub recovery_nonce: u64,
}

impl AccountState {
    pub fn new(owner: Address, guardians: GuardianSet, registry: CredentialRegistry, timelock: u64) -> Self {
        Self {
            owner,
            guardians,
            registry,
            removals: TimelockQueue::new(timelock),
            recoveries: TimelockQueue::new(timelock),
            recovery_nonce: 0,
        }
    }
}
