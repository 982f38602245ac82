//! Guardian recovery and guardian management
//!
//! Guardians propose and approve recovery requests by address; the
//! transport that submits the call is responsible for authenticating that
//! address. A request executes once enough *current* guardians have
//! approved it and its timelock has elapsed. Only the owner, signing with
//! an active passkey, can cancel a request or change the guardian set.

use tracing::{info, warn};
use warden_core::{
    AccountEvent, Address, Assertion, Challenge, DeactivationReason, Error, PasskeyPublicKey,
};

use crate::account::Account;
use crate::error::Result;
use crate::state::RecoveryPayload;

impl Account {
    /// Open a recovery request; the proposing guardian counts as its first
    /// approval
    ///
    /// Returns the request nonce.
    pub fn propose_recovery(
        &mut self,
        guardian: Address,
        new_owner: Option<Address>,
        new_credential: Option<PasskeyPublicKey>,
        now: u64,
    ) -> Result<u64> {
        if new_owner.is_none() && new_credential.is_none() {
            return Err(Error::InvalidRequest(
                "neither a new owner nor a new credential".to_string(),
            )
            .into());
        }
        if new_owner.is_some_and(|owner| owner.is_zero()) {
            return Err(Error::InvalidAddress("new owner is the zero address".to_string()).into());
        }
        if let Some(key) = &new_credential {
            key.validate()?;
            // Inactive records still hold their id
            let id = key.credential_id();
            if self.state.registry.contains(&id) {
                return Err(Error::DuplicateCredential(id.to_hex()).into());
            }
        }

        let nonce = self.state.recovery_nonce;
        let payload = RecoveryPayload {
            proposer: guardian,
            new_owner,
            new_credential,
        };

        let state = &mut self.state;
        let guardians = &state.guardians;
        state.recoveries.propose(nonce, payload, now, |_| {
            if guardians.contains(&guardian) {
                Ok(())
            } else {
                warn!(caller = %guardian, "Recovery proposed by non-guardian");
                Err(Error::Unauthorized(format!("{} is not a guardian", guardian)))
            }
        })?;
        state.recoveries.approve(&nonce, guardian)?;
        state.recovery_nonce += 1;

        info!(
            nonce,
            proposer = %guardian,
            new_owner = ?new_owner,
            new_credential = ?new_credential.map(|k| k.credential_id().short()),
            "Recovery proposed"
        );
        self.commit([
            AccountEvent::RecoveryProposed {
                nonce,
                proposer: guardian,
                new_owner,
                new_credential: new_credential.map(|k| k.credential_id()),
                timestamp: now,
            },
            AccountEvent::RecoveryApproved {
                nonce,
                guardian,
                approvals: 1,
                timestamp: now,
            },
        ]);
        Ok(nonce)
    }

    /// Record a guardian's approval
    ///
    /// Approving twice has no further effect. Returns the number of
    /// approvals from current guardians.
    pub fn approve_recovery(&mut self, guardian: Address, nonce: u64, now: u64) -> Result<usize> {
        self.ensure_guardian(&guardian)?;

        let state = &mut self.state;
        let newly_approved = state.recoveries.approve(&nonce, guardian)?;
        let approvals = state
            .guardians
            .count_approvals(state.recoveries.get(&nonce)?.approvals.iter());

        if newly_approved {
            info!(
                nonce,
                guardian = %guardian,
                approvals,
                threshold = self.state.guardians.threshold(),
                "Recovery approved"
            );
            self.commit([AccountEvent::RecoveryApproved {
                nonce,
                guardian,
                approvals,
                timestamp: now,
            }]);
        }
        Ok(approvals)
    }

    /// Apply a recovery that has its quorum and whose timelock has elapsed
    ///
    /// A new credential revokes every existing one. A new owner takes over
    /// the previous owner's guardian seat. All checks run before anything
    /// changes.
    pub fn execute_recovery(&mut self, nonce: u64, now: u64) -> Result<()> {
        let state = &mut self.state;
        let payload = state
            .recoveries
            .ensure_executable(&nonce, now, Some(&state.guardians))?
            .payload;

        let mut events = Vec::new();

        if let Some(key) = payload.new_credential {
            let reason = DeactivationReason::Recovery { nonce };
            events.extend(state.registry.replace_all(key, now, reason)?);
        }

        if let Some(new_owner) = payload.new_owner {
            let previous = state.owner;
            if new_owner != previous {
                state.owner = new_owner;
                let guardians = &mut state.guardians;
                let seat_moved = guardians.replace(&previous, new_owner);
                info!(previous = %previous, new_owner = %new_owner, "Owner changed");
                events.push(AccountEvent::OwnerChanged {
                    previous,
                    new_owner,
                    timestamp: now,
                });

                // New owner already held a seat; drop the old owner's
                if !seat_moved
                    && guardians.contains(&previous)
                    && guardians.len() > guardians.threshold()
                {
                    guardians.remove(&previous)?;
                    events.push(AccountEvent::GuardianRemoved {
                        guardian: previous,
                        timestamp: now,
                    });
                }
            }
        }

        state.recoveries.mark_executed(&nonce, now)?;
        events.push(AccountEvent::RecoveryExecuted {
            nonce,
            timestamp: now,
        });

        info!(
            nonce,
            active_credentials = self.state.registry.count_active(),
            "Recovery executed"
        );
        self.commit(events);
        Ok(())
    }

    /// Withdraw a recovery request; requires an owner passkey signature
    pub fn cancel_recovery(
        &mut self,
        challenge: &Challenge,
        assertion: &Assertion,
        nonce: u64,
        now: u64,
    ) -> Result<()> {
        let signer = self.authorize(challenge, assertion)?;

        self.state.recoveries.cancel(&nonce, now, |_| Ok(()))?;

        info!(nonce, cancelled_by = %signer.short(), "Recovery cancelled");
        self.commit([AccountEvent::RecoveryCancelled {
            nonce,
            cancelled_by: signer,
            timestamp: now,
        }]);
        Ok(())
    }

    // ============================================
    // Guardian management
    // ============================================

    pub fn add_guardian(
        &mut self,
        challenge: &Challenge,
        assertion: &Assertion,
        guardian: Address,
        now: u64,
    ) -> Result<()> {
        self.authorize(challenge, assertion)?;
        self.state.guardians.add(guardian)?;

        info!(guardian = %guardian, total = self.state.guardians.len(), "Guardian added");
        self.commit([AccountEvent::GuardianAdded {
            guardian,
            timestamp: now,
        }]);
        Ok(())
    }

    /// Remove a guardian; fails if the threshold would exceed the remaining set
    pub fn remove_guardian(
        &mut self,
        challenge: &Challenge,
        assertion: &Assertion,
        guardian: Address,
        now: u64,
    ) -> Result<()> {
        self.authorize(challenge, assertion)?;
        self.state.guardians.remove(&guardian)?;

        info!(guardian = %guardian, total = self.state.guardians.len(), "Guardian removed");
        self.commit([AccountEvent::GuardianRemoved {
            guardian,
            timestamp: now,
        }]);
        Ok(())
    }

    pub fn set_threshold(
        &mut self,
        challenge: &Challenge,
        assertion: &Assertion,
        threshold: usize,
        now: u64,
    ) -> Result<()> {
        self.authorize(challenge, assertion)?;
        self.state.guardians.set_threshold(threshold)?;

        info!(threshold, guardians = self.state.guardians.len(), "Threshold changed");
        self.commit([AccountEvent::ThresholdChanged {
            threshold,
            timestamp: now,
        }]);
        Ok(())
    }

    fn ensure_guardian(&self, caller: &Address) -> Result<()> {
        if !self.state.guardians.contains(caller) {
            warn!(caller = %caller, "Guardian action by non-guardian");
            return Err(Error::Unauthorized(format!("{} is not a guardian", caller)).into());
        }
        Ok(())
    }
}
