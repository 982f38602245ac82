//! Credential registry
//!
//! Append-only arena of passkey records. Records keep their registration
//! order (the order the legacy scan verifier walks) and are never removed;
//! deactivation only flips the `active` flag.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::credential::{Credential, DeactivationReason};
use crate::crypto::PasskeyPublicKey;
use crate::error::{Error, Result};
use crate::events::AccountEvent;
use crate::types::CredentialId;
use crate::MAX_CREDENTIALS;

/// Registry of all passkeys ever registered on an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RegistryRecords", into = "RegistryRecords")]
pub struct CredentialRegistry {
    /// Records in registration order
    records: Vec<Credential>,

    /// Position of each record in `records`
    index: HashMap<CredentialId, usize>,

    /// Maintained on every transition, never recomputed by scanning
    active_count: usize,

    /// Maximum number of records, active or not
    capacity: usize,
}

/// Serialized form; the index and counter are rebuilt on load
#[derive(Clone, Serialize, Deserialize)]
struct RegistryRecords {
    capacity: usize,
    records: Vec<Credential>,
}

impl TryFrom<RegistryRecords> for CredentialRegistry {
    type Error = Error;

    fn try_from(stored: RegistryRecords) -> Result<Self> {
        if stored.records.len() > stored.capacity {
            return Err(Error::RegistryFull(stored.records.len()));
        }

        let mut index = HashMap::with_capacity(stored.records.len());
        for (i, credential) in stored.records.iter().enumerate() {
            credential.public_key.validate()?;
            if credential.id != credential.public_key.credential_id() {
                return Err(Error::InvalidKey(format!(
                    "record {} does not match its public key",
                    credential.id.short()
                )));
            }
            if index.insert(credential.id, i).is_some() {
                return Err(Error::DuplicateCredential(credential.id.to_hex()));
            }
        }

        let active_count = stored.records.iter().filter(|c| c.active).count();
        if !stored.records.is_empty() && active_count == 0 {
            return Err(Error::LastCredential);
        }

        Ok(Self {
            records: stored.records,
            index,
            active_count,
            capacity: stored.capacity,
        })
    }
}

impl From<CredentialRegistry> for RegistryRecords {
    fn from(registry: CredentialRegistry) -> Self {
        Self {
            capacity: registry.capacity,
            records: registry.records,
        }
    }
}

impl Default for CredentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialRegistry {
    /// Create an empty registry holding at most [`MAX_CREDENTIALS`] records
    pub fn new() -> Self {
        Self::with_capacity(MAX_CREDENTIALS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            active_count: 0,
            capacity,
        }
    }

    /// Register a new passkey as active
    pub fn register(&mut self, public_key: PasskeyPublicKey, now: u64) -> Result<AccountEvent> {
        self.check_insertable(&public_key)?;
        Ok(self.insert(public_key, now))
    }

    fn check_insertable(&self, public_key: &PasskeyPublicKey) -> Result<()> {
        public_key.validate()?;

        let id = public_key.credential_id();
        if self.index.contains_key(&id) {
            return Err(Error::DuplicateCredential(id.to_hex()));
        }

        if self.records.len() >= self.capacity {
            return Err(Error::RegistryFull(self.records.len()));
        }

        Ok(())
    }

    fn insert(&mut self, public_key: PasskeyPublicKey, now: u64) -> AccountEvent {
        let credential = Credential::new(public_key, now);
        let id = credential.id;

        self.index.insert(id, self.records.len());
        self.records.push(credential);
        self.active_count += 1;

        info!(credential = %id.short(), "Credential registered");

        AccountEvent::CredentialAdded {
            credential_id: id,
            public_key,
            timestamp: now,
        }
    }

    /// Disable an active credential, refusing to disable the last one
    pub fn deactivate(
        &mut self,
        id: &CredentialId,
        now: u64,
        reason: DeactivationReason,
    ) -> Result<AccountEvent> {
        self.ensure_removable(id)?;

        let position = self.position(id)?;
        self.records[position].deactivate(now, reason);
        self.active_count -= 1;

        info!(credential = %id.short(), %reason, "Credential deactivated");

        Ok(AccountEvent::CredentialDeactivated {
            credential_id: *id,
            reason,
            timestamp: now,
        })
    }

    /// Check that `id` is active and not the only active credential
    pub fn ensure_removable(&self, id: &CredentialId) -> Result<()> {
        self.lookup_active(id)?;
        if self.active_count <= 1 {
            return Err(Error::LastCredential);
        }
        Ok(())
    }

    /// Revoke every active credential and install `public_key` as the only
    /// active one
    ///
    /// All checks run before anything is mutated.
    pub fn replace_all(
        &mut self,
        public_key: PasskeyPublicKey,
        now: u64,
        reason: DeactivationReason,
    ) -> Result<Vec<AccountEvent>> {
        self.check_insertable(&public_key)?;

        let mut events = Vec::with_capacity(self.active_count + 1);
        for credential in self.records.iter_mut().filter(|c| c.active) {
            credential.deactivate(now, reason);
            info!(credential = %credential.id.short(), %reason, "Credential revoked");
            events.push(AccountEvent::CredentialDeactivated {
                credential_id: credential.id,
                reason,
                timestamp: now,
            });
        }
        self.active_count = 0;

        events.push(self.insert(public_key, now));
        Ok(events)
    }

    /// Get a credential by ID, active or not
    pub fn lookup(&self, id: &CredentialId) -> Result<&Credential> {
        self.index
            .get(id)
            .map(|&i| &self.records[i])
            .ok_or_else(|| Error::NotFound(format!("credential {}", id.to_hex())))
    }

    /// Get a credential by ID only if it is active
    pub fn lookup_active(&self, id: &CredentialId) -> Result<&Credential> {
        let credential = self.lookup(id)?;
        if !credential.active {
            return Err(Error::NotFound(format!(
                "active credential {}",
                id.to_hex()
            )));
        }
        Ok(credential)
    }

    fn position(&self, id: &CredentialId) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("credential {}", id.to_hex())))
    }

    pub fn contains(&self, id: &CredentialId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of active credentials, O(1)
    pub fn count_active(&self) -> usize {
        self.active_count
    }

    /// Number of records, active and inactive
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All records in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.records.iter()
    }

    /// Active records in registration order
    pub fn iter_active(&self) -> impl Iterator<Item = &Credential> {
        self.records.iter().filter(|c| c.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PasskeyFixture;

    fn key(seed: u8) -> PasskeyPublicKey {
        PasskeyFixture::from_seed(seed).public_key()
    }

    fn removal() -> DeactivationReason {
        DeactivationReason::Removal {
            action_hash: crate::types::ActionHash::new([0u8; 32]),
        }
    }

    #[test]
    fn test_register_credential() {
        let mut registry = CredentialRegistry::new();
        let event = registry.register(key(1), 100).unwrap();

        let id = key(1).credential_id();
        assert!(matches!(event, AccountEvent::CredentialAdded { credential_id, .. } if credential_id == id));
        assert!(registry.lookup(&id).unwrap().active);
        assert_eq!(registry.count_active(), 1);
    }

    #[test]
    fn test_duplicate_credential_rejected() {
        let mut registry = CredentialRegistry::new();
        registry.register(key(1), 100).unwrap();

        let result = registry.register(key(1), 200);
        assert!(matches!(result, Err(Error::DuplicateCredential(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_zero_key_rejected() {
        let mut registry = CredentialRegistry::new();
        let result = registry.register(PasskeyPublicKey::new([0u8; 32], [0u8; 32]), 100);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_capacity_counts_inactive_records() {
        let mut registry = CredentialRegistry::with_capacity(2);
        registry.register(key(1), 100).unwrap();
        registry.register(key(2), 100).unwrap();
        registry
            .deactivate(&key(1).credential_id(), 200, removal())
            .unwrap();

        let result = registry.register(key(3), 300);
        assert!(matches!(result, Err(Error::RegistryFull(2))));
    }

    #[test]
    fn test_last_credential_cannot_be_deactivated() {
        let mut registry = CredentialRegistry::new();
        registry.register(key(1), 100).unwrap();

        let result = registry.deactivate(&key(1).credential_id(), 200, removal());
        assert!(matches!(result, Err(Error::LastCredential)));
        assert_eq!(registry.count_active(), 1);
    }

    #[test]
    fn test_deactivate_unknown_credential() {
        let mut registry = CredentialRegistry::new();
        registry.register(key(1), 100).unwrap();

        let result = registry.deactivate(&key(2).credential_id(), 200, removal());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_deactivated_record_is_kept() {
        let mut registry = CredentialRegistry::new();
        registry.register(key(1), 100).unwrap();
        registry.register(key(2), 100).unwrap();
        registry
            .deactivate(&key(1).credential_id(), 200, removal())
            .unwrap();

        let record = registry.lookup(&key(1).credential_id()).unwrap();
        assert!(!record.active);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.count_active(), 1);
        assert!(registry.lookup_active(&key(1).credential_id()).is_err());
    }

    #[test]
    fn test_replace_all_leaves_single_active() {
        let mut registry = CredentialRegistry::new();
        registry.register(key(1), 100).unwrap();
        registry.register(key(2), 100).unwrap();

        let events = registry
            .replace_all(key(3), 500, DeactivationReason::Recovery { nonce: 0 })
            .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(registry.count_active(), 1);
        let active: Vec<_> = registry.iter_active().map(|c| c.id).collect();
        assert_eq!(active, vec![key(3).credential_id()]);
    }

    #[test]
    fn test_replace_all_is_atomic_when_full() {
        let mut registry = CredentialRegistry::with_capacity(2);
        registry.register(key(1), 100).unwrap();
        registry.register(key(2), 100).unwrap();
        let before = registry.clone();

        let result = registry.replace_all(key(3), 500, DeactivationReason::Recovery { nonce: 0 });
        assert!(matches!(result, Err(Error::RegistryFull(_))));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_serde_rebuilds_index_and_counter() {
        let mut registry = CredentialRegistry::new();
        registry.register(key(1), 100).unwrap();
        registry.register(key(2), 100).unwrap();
        registry
            .deactivate(&key(2).credential_id(), 200, removal())
            .unwrap();

        let json = serde_json::to_string(&registry).unwrap();
        let restored: CredentialRegistry = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, registry);
        assert_eq!(restored.count_active(), 1);
    }

    fn tampered(registry: &CredentialRegistry, edit: impl FnOnce(&mut serde_json::Value)) -> serde_json::Value {
        let mut value = serde_json::to_value(registry).unwrap();
        edit(&mut value);
        value
    }

    #[test]
    fn test_deserialize_rejects_broken_invariants() {
        let mut registry = CredentialRegistry::new();
        registry.register(key(1), 100).unwrap();
        registry.register(key(2), 100).unwrap();

        let duplicate = tampered(&registry, |v| {
            let first = v["records"][0].clone();
            v["records"][1] = first;
        });
        assert!(serde_json::from_value::<CredentialRegistry>(duplicate).is_err());

        let none_active = tampered(&registry, |v| {
            v["records"][0]["active"] = serde_json::json!(false);
            v["records"][1]["active"] = serde_json::json!(false);
        });
        assert!(serde_json::from_value::<CredentialRegistry>(none_active).is_err());

        let over_capacity = tampered(&registry, |v| v["capacity"] = serde_json::json!(1));
        assert!(serde_json::from_value::<CredentialRegistry>(over_capacity).is_err());

        let wrong_id = tampered(&registry, |v| {
            v["records"][0]["id"] = serde_json::json!(key(3).credential_id().to_hex());
        });
        assert!(serde_json::from_value::<CredentialRegistry>(wrong_id).is_err());

        let empty = serde_json::to_value(CredentialRegistry::new()).unwrap();
        assert!(serde_json::from_value::<CredentialRegistry>(empty).is_ok());
    }
}
