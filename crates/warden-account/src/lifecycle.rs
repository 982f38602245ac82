//! Credential lifecycle
//!
//! Adding a passkey takes effect immediately once any active credential
//! signs for it. Removing one goes through the timelocked queue, and the
//! last-credential guard is checked again when the removal executes.

use tracing::info;
use warden_core::{
    AccountEvent, ActionHash, Assertion, Challenge, CredentialId, DeactivationReason,
    PasskeyPublicKey,
};

use crate::account::Account;
use crate::error::Result;
use crate::state::RemovalPayload;

impl Account {
    /// Register a new passkey, authorized by an existing active one
    pub fn add_credential(
        &mut self,
        challenge: &Challenge,
        assertion: &Assertion,
        public_key: PasskeyPublicKey,
        now: u64,
    ) -> Result<CredentialId> {
        let signer = self.authorize(challenge, assertion)?;

        let event = self.state.registry.register(public_key, now)?;
        let id = public_key.credential_id();

        info!(credential = %id.short(), authorized_by = %signer.short(), "Credential added");
        self.commit([event]);
        Ok(id)
    }

    /// Queue removal of an active credential
    ///
    /// Any active credential may sign, including the one being removed.
    pub fn propose_removal(
        &mut self,
        challenge: &Challenge,
        assertion: &Assertion,
        credential_id: CredentialId,
        now: u64,
    ) -> Result<ActionHash> {
        let signer = self.authorize(challenge, assertion)?;

        let action_hash = ActionHash::for_removal(&credential_id, now);
        let payload = RemovalPayload {
            credential_id,
            proposed_by: signer,
        };

        let state = &mut self.state;
        let registry = &state.registry;
        state.removals.propose(action_hash, payload, now, |p| {
            registry.lookup_active(&p.credential_id).map(|_| ())
        })?;

        info!(
            action = %action_hash.short(),
            credential = %credential_id.short(),
            executable_at = now.saturating_add(self.state.removals.delay()),
            "Removal proposed"
        );
        self.commit([AccountEvent::RemovalProposed {
            action_hash,
            credential_id,
            proposed_by: signer,
            timestamp: now,
        }]);
        Ok(action_hash)
    }

    /// Apply a removal whose timelock has elapsed
    ///
    /// Needs no signature: the proposal was authorized and the delay gave
    /// the owner time to cancel. Fails with `LastCredential` if the target
    /// is now the only active credential; the proposal then stays pending.
    pub fn execute_removal(&mut self, action_hash: &ActionHash, now: u64) -> Result<CredentialId> {
        let state = &mut self.state;
        let registry = &mut state.registry;
        let reason = DeactivationReason::Removal {
            action_hash: *action_hash,
        };

        let (credential_id, deactivated) =
            state.removals.execute(action_hash, now, None, |p| {
                let event = registry.deactivate(&p.credential_id, now, reason)?;
                Ok((p.credential_id, event))
            })?;

        info!(
            action = %action_hash.short(),
            credential = %credential_id.short(),
            remaining = self.state.registry.count_active(),
            "Removal executed"
        );
        self.commit([
            deactivated,
            AccountEvent::RemovalExecuted {
                action_hash: *action_hash,
                credential_id,
                timestamp: now,
            },
        ]);
        Ok(credential_id)
    }

    /// Withdraw a pending removal, authorized by any active credential
    pub fn cancel_removal(
        &mut self,
        challenge: &Challenge,
        assertion: &Assertion,
        action_hash: &ActionHash,
        now: u64,
    ) -> Result<()> {
        let signer = self.authorize(challenge, assertion)?;

        self.state.removals.cancel(action_hash, now, |_| Ok(()))?;

        info!(action = %action_hash.short(), cancelled_by = %signer.short(), "Removal cancelled");
        self.commit([AccountEvent::RemovalCancelled {
            action_hash: *action_hash,
            cancelled_by: signer,
            timestamp: now,
        }]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountConfig;
    use warden_core::testing::PasskeyFixture;
    use warden_core::{Address, ErrorKind, TIMELOCK};

    const T0: u64 = 1_700_000_000;

    fn challenge(b: u8) -> Challenge {
        Challenge::new([b; 32])
    }

    fn account_with(seeds: &[u8]) -> Account {
        let first = PasskeyFixture::from_seed(seeds[0]);
        let mut account = Account::initialize(
            AccountConfig::default(),
            Address::new([1u8; 20]),
            first.public_key(),
            [],
            1,
            T0,
        )
        .unwrap();
        for &seed in &seeds[1..] {
            account
                .add_credential(
                    &challenge(seed),
                    &first.direct(&challenge(seed)),
                    PasskeyFixture::from_seed(seed).public_key(),
                    T0,
                )
                .unwrap();
        }
        account.take_events();
        account
    }

    #[test]
    fn test_add_credential_requires_active_signer() {
        let mut account = account_with(&[1]);
        let stranger = PasskeyFixture::from_seed(9);

        let result = account.add_credential(
            &challenge(0),
            &stranger.direct(&challenge(0)),
            PasskeyFixture::from_seed(2).public_key(),
            T0,
        );
        assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::Unauthorized));
        assert_eq!(account.count_active(), 1);
        assert!(account.take_events().is_empty());
    }

    #[test]
    fn test_add_duplicate_credential() {
        let mut account = account_with(&[1, 2]);
        let signer = PasskeyFixture::from_seed(1);

        let result = account.add_credential(
            &challenge(0),
            &signer.direct(&challenge(0)),
            PasskeyFixture::from_seed(2).public_key(),
            T0,
        );
        assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::DuplicateCredential));
    }

    #[test]
    fn test_removal_timelock() {
        let mut account = account_with(&[1, 2]);
        let signer = PasskeyFixture::from_seed(2);
        let target = PasskeyFixture::from_seed(1).credential_id();

        let hash = account
            .propose_removal(&challenge(7), &signer.direct(&challenge(7)), target, T0)
            .unwrap();

        let early = account.execute_removal(&hash, T0 + TIMELOCK - 1);
        assert_eq!(early.unwrap_err().kind(), Some(ErrorKind::NotYetExecutable));
        assert_eq!(account.count_active(), 2);

        assert_eq!(account.execute_removal(&hash, T0 + TIMELOCK).unwrap(), target);
        assert_eq!(account.count_active(), 1);
        assert!(!account.credential(&target).unwrap().active);

        let names: Vec<_> = account.take_events().iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["removal_proposed", "credential_deactivated", "removal_executed"]
        );
    }

    #[test]
    fn test_propose_removal_of_unknown_credential() {
        let mut account = account_with(&[1, 2]);
        let signer = PasskeyFixture::from_seed(1);

        let result = account.propose_removal(
            &challenge(0),
            &signer.direct(&challenge(0)),
            PasskeyFixture::from_seed(5).credential_id(),
            T0,
        );
        assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::NotFound));
        assert_eq!(account.state().removals.len(), 0);
    }

    #[test]
    fn test_same_second_proposal_is_already_pending() {
        let mut account = account_with(&[1, 2]);
        let signer = PasskeyFixture::from_seed(1);
        let target = PasskeyFixture::from_seed(2).credential_id();

        account
            .propose_removal(&challenge(0), &signer.direct(&challenge(0)), target, T0)
            .unwrap();
        let result =
            account.propose_removal(&challenge(1), &signer.direct(&challenge(1)), target, T0);
        assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::AlreadyPending));
    }

    #[test]
    fn test_cancelled_removal_is_terminal() {
        let mut account = account_with(&[1, 2]);
        let signer = PasskeyFixture::from_seed(1);
        let target = PasskeyFixture::from_seed(2).credential_id();

        let hash = account
            .propose_removal(&challenge(0), &signer.direct(&challenge(0)), target, T0)
            .unwrap();
        account
            .cancel_removal(&challenge(1), &signer.scan(&challenge(1)), &hash, T0 + 10)
            .unwrap();

        let result = account.execute_removal(&hash, T0 + TIMELOCK);
        assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::AlreadyTerminal));
        assert_eq!(account.count_active(), 2);
    }

    #[test]
    fn test_cancel_requires_signature() {
        let mut account = account_with(&[1, 2]);
        let signer = PasskeyFixture::from_seed(1);
        let target = PasskeyFixture::from_seed(2).credential_id();

        let hash = account
            .propose_removal(&challenge(0), &signer.direct(&challenge(0)), target, T0)
            .unwrap();
        let stranger = PasskeyFixture::from_seed(8);
        let result =
            account.cancel_removal(&challenge(1), &stranger.direct(&challenge(1)), &hash, T0);
        assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::Unauthorized));
        assert!(account.pending_removal(&hash).unwrap().status.is_pending());
    }

    #[test]
    fn test_removed_credential_cannot_sign() {
        let mut account = account_with(&[1, 2]);
        let removed = PasskeyFixture::from_seed(1);

        let hash = account
            .propose_removal(
                &challenge(0),
                &removed.direct(&challenge(0)),
                removed.credential_id(),
                T0,
            )
            .unwrap();
        account.execute_removal(&hash, T0 + TIMELOCK).unwrap();

        let result = account.validate_request(&challenge(3), &removed.direct(&challenge(3)));
        assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::Unauthorized));
    }
}
