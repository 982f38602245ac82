//! Guardian set for social recovery

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::types::Address;

/// Addresses allowed to propose and approve recovery, plus the approval
/// threshold. Always `1 <= threshold <= guardians.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GuardianRecords", into = "GuardianRecords")]
pub struct GuardianSet {
    guardians: BTreeSet<Address>,
    threshold: usize,
}

/// Serialized form; re-checked against the set invariants on load
#[derive(Clone, Serialize, Deserialize)]
struct GuardianRecords {
    guardians: Vec<Address>,
    threshold: usize,
}

impl TryFrom<GuardianRecords> for GuardianSet {
    type Error = Error;

    fn try_from(stored: GuardianRecords) -> Result<Self> {
        Self::new(stored.guardians, stored.threshold)
    }
}

impl From<GuardianSet> for GuardianRecords {
    fn from(set: GuardianSet) -> Self {
        Self {
            guardians: set.guardians.into_iter().collect(),
            threshold: set.threshold,
        }
    }
}

impl GuardianSet {
    /// Build a guardian set; duplicate addresses are rejected
    pub fn new(guardians: impl IntoIterator<Item = Address>, threshold: usize) -> Result<Self> {
        let mut set = BTreeSet::new();
        for guardian in guardians {
            if guardian.is_zero() {
                return Err(Error::InvalidAddress("zero address cannot be a guardian".to_string()));
            }
            if !set.insert(guardian) {
                return Err(Error::DuplicateGuardian(guardian.to_hex()));
            }
        }
        Self::check_threshold(threshold, set.len())?;
        Ok(Self {
            guardians: set,
            threshold,
        })
    }

    fn check_threshold(threshold: usize, guardians: usize) -> Result<()> {
        if threshold == 0 || threshold > guardians {
            return Err(Error::InvalidThreshold {
                threshold,
                guardians,
            });
        }
        Ok(())
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.guardians.contains(address)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.guardians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guardians.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.guardians.iter()
    }

    pub fn add(&mut self, guardian: Address) -> Result<()> {
        if guardian.is_zero() {
            return Err(Error::InvalidAddress("zero address cannot be a guardian".to_string()));
        }
        if !self.guardians.insert(guardian) {
            return Err(Error::DuplicateGuardian(guardian.to_hex()));
        }
        Ok(())
    }

    /// Remove a guardian without letting the threshold exceed the set size
    pub fn remove(&mut self, guardian: &Address) -> Result<()> {
        if !self.guardians.contains(guardian) {
            return Err(Error::NotFound(format!("guardian {}", guardian)));
        }
        Self::check_threshold(self.threshold, self.guardians.len() - 1)?;
        self.guardians.remove(guardian);
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: usize) -> Result<()> {
        Self::check_threshold(threshold, self.guardians.len())?;
        self.threshold = threshold;
        Ok(())
    }

    /// Swap one member for another, keeping size and threshold
    ///
    /// No-op unless `old` is a member and `new` is not.
    pub fn replace(&mut self, old: &Address, new: Address) -> bool {
        if self.guardians.contains(&new) || !self.guardians.remove(old) {
            return false;
        }
        self.guardians.insert(new);
        true
    }

    /// Approvals that come from current members
    pub fn count_approvals<'a>(&self, approvers: impl IntoIterator<Item = &'a Address>) -> usize {
        approvers
            .into_iter()
            .filter(|a| self.guardians.contains(a))
            .count()
    }

    pub fn is_satisfied_by<'a>(&self, approvers: impl IntoIterator<Item = &'a Address>) -> bool {
        self.count_approvals(approvers) >= self.threshold
    }
}
