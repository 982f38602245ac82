//! Timelocked action queue
//!
//! Generic propose -> (approve) -> delay -> execute | cancel state machine.
//! "Executable" is never stored: it is evaluated from `(now, proposed_at)`
//! on every call, so nothing has to be scheduled. A proposal that nobody
//! executes or cancels stays pending indefinitely.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::guardian::GuardianSet;
use crate::types::Address;

/// Lifecycle of a queued action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionStatus {
    /// Waiting for delay and approvals
    #[default]
    Proposed,

    /// Effect applied (terminal)
    Executed {
        /// Unix timestamp of execution
        at: u64,
    },

    /// Withdrawn before execution (terminal)
    Cancelled {
        /// Unix timestamp of cancellation
        at: u64,
    },
}

impl ActionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ActionStatus::Proposed)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

/// One queued action and its approvals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction<P> {
    pub payload: P,
    pub proposed_at: u64,
    /// Set semantics: approving twice records once
    pub approvals: BTreeSet<Address>,
    pub status: ActionStatus,
}

impl<P> PendingAction<P> {
    /// Earliest time the action may execute
    pub fn executable_at(&self, delay: u64) -> u64 {
        self.proposed_at.saturating_add(delay)
    }

    /// Delay elapsed at `now`
    pub fn is_unlocked(&self, now: u64, delay: u64) -> bool {
        now >= self.executable_at(delay)
    }
}

/// Queue of timelocked actions keyed by `K`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Ord + Serialize, P: Serialize",
    deserialize = "K: Ord + Deserialize<'de>, P: Deserialize<'de>"
))]
pub struct TimelockQueue<K, P> {
    delay: u64,
    actions: BTreeMap<K, PendingAction<P>>,
}

impl<K, P> TimelockQueue<K, P>
where
    K: Ord + Copy + core::fmt::Debug,
{
    pub fn new(delay: u64) -> Self {
        Self {
            delay,
            actions: BTreeMap::new(),
        }
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    /// Queue a new action after `authorize` accepts its payload
    pub fn propose(
        &mut self,
        key: K,
        payload: P,
        now: u64,
        authorize: impl FnOnce(&P) -> Result<()>,
    ) -> Result<&PendingAction<P>> {
        authorize(&payload)?;

        if self.actions.contains_key(&key) {
            return Err(Error::AlreadyPending(format!("{:?}", key)));
        }

        Ok(self.actions.entry(key).or_insert(PendingAction {
            payload,
            proposed_at: now,
            approvals: BTreeSet::new(),
            status: ActionStatus::Proposed,
        }))
    }

    /// Record an approval; returns false if `approver` had already approved
    pub fn approve(&mut self, key: &K, approver: Address) -> Result<bool> {
        let action = self.pending_mut(key)?;
        Ok(action.approvals.insert(approver))
    }

    /// Check that an action may run now
    ///
    /// With a `quorum`, only approvals from its current members count, and
    /// they are compared against its current threshold.
    pub fn ensure_executable(
        &self,
        key: &K,
        now: u64,
        quorum: Option<&GuardianSet>,
    ) -> Result<&PendingAction<P>> {
        let action = self.get(key)?;
        if action.status.is_terminal() {
            return Err(Error::AlreadyTerminal(format!("{:?}", key)));
        }

        if let Some(guardians) = quorum {
            let approvals = guardians.count_approvals(action.approvals.iter());
            if approvals < guardians.threshold() {
                return Err(Error::NotYetExecutable(format!(
                    "{} of {} guardian approvals",
                    approvals,
                    guardians.threshold()
                )));
            }
        }

        if !action.is_unlocked(now, self.delay) {
            return Err(Error::NotYetExecutable(format!(
                "timelock ends at {}, now {}",
                action.executable_at(self.delay),
                now
            )));
        }

        Ok(action)
    }

    /// Mark a checked action as executed
    pub fn mark_executed(&mut self, key: &K, now: u64) -> Result<()> {
        self.pending_mut(key)?.status = ActionStatus::Executed { at: now };
        Ok(())
    }

    /// Check, apply, and mark executed in one step
    ///
    /// `apply` re-validates current state and performs the effect; if it
    /// fails the action stays pending and nothing changes.
    pub fn execute<R>(
        &mut self,
        key: &K,
        now: u64,
        quorum: Option<&GuardianSet>,
        apply: impl FnOnce(&P) -> Result<R>,
    ) -> Result<R> {
        let action = self.ensure_executable(key, now, quorum)?;
        let outcome = apply(&action.payload)?;
        self.mark_executed(key, now)?;
        Ok(outcome)
    }

    /// Withdraw a pending action after `authorize` accepts
    pub fn cancel(
        &mut self,
        key: &K,
        now: u64,
        authorize: impl FnOnce(&PendingAction<P>) -> Result<()>,
    ) -> Result<()> {
        let action = self.pending_mut(key)?;
        authorize(action)?;
        action.status = ActionStatus::Cancelled { at: now };
        Ok(())
    }

    pub fn get(&self, key: &K) -> Result<&PendingAction<P>> {
        self.actions
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("action {:?}", key)))
    }

    fn pending_mut(&mut self, key: &K) -> Result<&mut PendingAction<P>> {
        let action = self
            .actions
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("action {:?}", key)))?;
        if action.status.is_terminal() {
            return Err(Error::AlreadyTerminal(format!("{:?}", key)));
        }
        Ok(action)
    }

    /// All actions, terminal ones included
    pub fn iter(&self) -> impl Iterator<Item = (&K, &PendingAction<P>)> {
        self.actions.iter()
    }

    /// Actions still awaiting execution or cancellation
    pub fn pending(&self) -> impl Iterator<Item = (&K, &PendingAction<P>)> {
        self.actions.iter().filter(|(_, a)| a.status.is_pending())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
