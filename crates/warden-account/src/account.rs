//! Account engine
//!
//! An [`Account`] owns its state and is driven by one caller at a time.
//! Every entry point takes the current time explicitly; timelocks are
//! evaluated against it on each call. A call that returns an error leaves
//! the state and the event journal untouched.

use std::iter;

use tracing::info;
use warden_core::{
    AccountEvent, ActionHash, Address, Assertion, Challenge, Credential, CredentialId, CredentialRegistry,
    GuardianSet, PasskeyPublicKey, PendingAction, SignatureVerifier, VerifiedAssertion,
};

use crate::config::AccountConfig;
use crate::error::Result;
use crate::state::{AccountState, RecoveryPayload, RemovalPayload};

/// A passkey-controlled account with guardian recovery
#[derive(Debug, Clone)]
pub struct Account {
    pub(crate) config: AccountConfig,
    pub(crate) state: AccountState,
    events: Vec<AccountEvent>,
}

impl Account {
    /// Create an account with one passkey and its guardian set
    ///
    /// The owner is added to `guardians` if not already listed.
    pub fn initialize(
        config: AccountConfig,
        owner: Address,
        passkey: PasskeyPublicKey,
        guardians: impl IntoIterator<Item = Address>,
        threshold: usize,
        now: u64,
    ) -> Result<Self> {
        config.validate()?;

        let members = guardians
            .into_iter()
            .filter(|g| *g != owner)
            .chain(iter::once(owner));
        let guardians = GuardianSet::new(members, threshold)?;

        let mut registry = CredentialRegistry::with_capacity(config.max_credentials);
        let added = registry.register(passkey, now)?;

        info!(
            owner = %owner,
            guardians = guardians.len(),
            threshold = guardians.threshold(),
            "Account initialized"
        );

        let state = AccountState::new(owner, guardians, registry, config.timelock_secs);
        let mut account = Self {
            config,
            state,
            events: Vec::new(),
        };
        account.commit([added]);
        Ok(account)
    }

    /// Resume an account from saved state
    ///
    /// Timelock delays are fixed when the account is created; the config's
    /// `timelock_secs` does not change queues that already exist.
    pub fn from_state(config: AccountConfig, state: AccountState) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state,
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    pub fn state(&self) -> &AccountState {
        &self.state
    }

    pub fn into_state(self) -> AccountState {
        self.state
    }

    // ============================================
    // Authorization
    // ============================================

    /// Decide whether a passkey assertion authorizes a request
    ///
    /// Accepts the direct and scan encodings.
    pub fn validate_request(
        &self,
        challenge: &Challenge,
        assertion: &Assertion,
    ) -> Result<VerifiedAssertion> {
        Ok(self.verifier().verify_request(challenge, assertion)?)
    }

    /// [`Account::validate_request`] over the tagged wire encoding
    pub fn validate_request_bytes(
        &self,
        challenge: &Challenge,
        encoded: &[u8],
    ) -> Result<VerifiedAssertion> {
        let assertion = Assertion::decode(encoded)?;
        self.validate_request(challenge, &assertion)
    }

    /// Signature-validity query; also accepts a raw curve signature over `hash`
    pub fn check_signature(&self, hash: &Challenge, assertion: &Assertion) -> Result<VerifiedAssertion> {
        Ok(self.verifier().verify_signature(hash, assertion)?)
    }

    /// Boolean form of [`Account::check_signature`] over the wire encoding
    pub fn is_valid_signature(&self, hash: &Challenge, encoded: &[u8]) -> bool {
        match Assertion::decode(encoded) {
            Ok(assertion) => self.check_signature(hash, &assertion).is_ok(),
            Err(_) => false,
        }
    }

    /// Verify a request assertion and return the credential that signed it
    pub(crate) fn authorize(&self, challenge: &Challenge, assertion: &Assertion) -> Result<CredentialId> {
        Ok(self.validate_request(challenge, assertion)?.credential_id)
    }

    fn verifier(&self) -> SignatureVerifier<'_> {
        SignatureVerifier::new(&self.state.registry, &self.config.verifier)
    }

    // ============================================
    // Event journal
    // ============================================

    /// Record events of a call that has fully succeeded
    pub(crate) fn commit(&mut self, events: impl IntoIterator<Item = AccountEvent>) {
        for event in events {
            info!(event = event.name(), timestamp = event.timestamp(), "Event emitted");
            self.events.push(event);
        }
    }

    /// Drain events committed since the last call
    pub fn take_events(&mut self) -> Vec<AccountEvent> {
        std::mem::take(&mut self.events)
    }

    // ============================================
    // Queries
    // ============================================

    pub fn owner(&self) -> Address {
        self.state.owner
    }

    pub fn guardians(&self) -> &GuardianSet {
        &self.state.guardians
    }

    pub fn credential(&self, id: &CredentialId) -> Result<&Credential> {
        Ok(self.state.registry.lookup(id)?)
    }

    /// Every credential ever registered, in registration order
    pub fn credentials(&self) -> impl Iterator<Item = &Credential> {
        self.state.registry.iter()
    }

    pub fn active_credentials(&self) -> impl Iterator<Item = &Credential> {
        self.state.registry.iter_active()
    }

    pub fn count_active(&self) -> usize {
        self.state.registry.count_active()
    }

    pub fn pending_removal(&self, hash: &ActionHash) -> Result<&PendingAction<RemovalPayload>> {
        Ok(self.state.removals.get(hash)?)
    }

    pub fn recovery(&self, nonce: u64) -> Result<&PendingAction<RecoveryPayload>> {
        Ok(self.state.recoveries.get(&nonce)?)
    }

    /// Nonce the next recovery request will receive
    pub fn recovery_nonce(&self) -> u64 {
        self.state.recovery_nonce
    }
}
