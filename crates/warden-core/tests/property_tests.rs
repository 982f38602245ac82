//! Property-based tests for warden-core using proptest
//!
//! These tests verify invariants that should hold for all valid inputs.

use proptest::prelude::*;
use warden_core::{
    assertion::{Assertion, WebAuthnAssertion},
    crypto::{CurveSignature, PasskeyPublicKey},
    timelock::TimelockQueue,
    types::{Address, CredentialId},
    Error, GuardianSet, TIMELOCK,
};

// ============================================
// Arbitrary Implementations
// ============================================

fn arb_signature() -> impl Strategy<Value = CurveSignature> {
    (any::<[u8; 32]>(), any::<[u8; 32]>()).prop_map(|(r, s)| CurveSignature::from_scalars(r, s))
}

fn arb_webauthn() -> impl Strategy<Value = WebAuthnAssertion> {
    (
        arb_signature(),
        prop::collection::vec(any::<u8>(), 37..200),
        "[a-zA-Z0-9{}:\",]{1,200}",
    )
        .prop_map(|(signature, auth_data, client_data)| {
            WebAuthnAssertion::new(signature, auth_data, client_data.into_bytes())
        })
}

fn arb_assertion() -> impl Strategy<Value = Assertion> {
    prop_oneof![
        arb_signature().prop_map(|signature| Assertion::Raw { signature }),
        (any::<[u8; 32]>(), arb_webauthn()).prop_map(|(id, webauthn)| Assertion::Direct {
            credential_id: CredentialId::new(id),
            webauthn,
        }),
        arb_webauthn().prop_map(|webauthn| Assertion::Scan { webauthn }),
    ]
}

// ============================================
// Credential identity
// ============================================

proptest! {
    #[test]
    fn credential_id_is_deterministic(qx in any::<[u8; 32]>(), qy in any::<[u8; 32]>()) {
        let a = PasskeyPublicKey::new(qx, qy);
        let b = PasskeyPublicKey::new(qx, qy);
        prop_assert_eq!(a.credential_id(), b.credential_id());
    }

    #[test]
    fn credential_id_separates_coordinates(
        qx in any::<[u8; 32]>(),
        qy in any::<[u8; 32]>(),
        flip in 0usize..64,
    ) {
        let mut other_x = qx;
        let mut other_y = qy;
        if flip < 32 {
            other_x[flip] ^= 0x01;
        } else {
            other_y[flip - 32] ^= 0x01;
        }
        prop_assert_ne!(
            PasskeyPublicKey::new(qx, qy).credential_id(),
            PasskeyPublicKey::new(other_x, other_y).credential_id()
        );
    }
}

// ============================================
// Assertion wire format
// ============================================

proptest! {
    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..400)) {
        match Assertion::decode(&bytes) {
            Ok(_) => {}
            Err(e) => prop_assert!(matches!(e, Error::MalformedSignature(_))),
        }
    }

    #[test]
    fn encoded_assertions_decode_to_themselves(assertion in arb_assertion()) {
        let bytes = assertion.encode().unwrap();
        prop_assert_eq!(Assertion::decode(&bytes).unwrap(), assertion);
    }
}

// ============================================
// Timelock boundary
// ============================================

proptest! {
    #[test]
    fn execution_unlocks_exactly_at_timelock(
        proposed_at in 0u64..4_000_000_000,
        elapsed in 0u64..(3 * TIMELOCK),
    ) {
        let mut queue: TimelockQueue<u64, ()> = TimelockQueue::new(TIMELOCK);
        queue.propose(0, (), proposed_at, |_| Ok(())).unwrap();

        let result = queue.execute(&0, proposed_at + elapsed, None, |_| Ok(()));
        if elapsed < TIMELOCK {
            prop_assert!(matches!(result, Err(Error::NotYetExecutable(_))));
            prop_assert!(queue.get(&0).unwrap().status.is_pending());
        } else {
            prop_assert!(result.is_ok());
            prop_assert!(queue.get(&0).unwrap().status.is_terminal());
        }
    }
}

// ============================================
// Guardian threshold
// ============================================

proptest! {
    #[test]
    fn guardian_threshold_within_bounds(size in 1usize..12, threshold in 0usize..14) {
        let guardians = (1..=size as u8).map(|b| Address::new([b; 20]));
        let result = GuardianSet::new(guardians, threshold);
        if threshold >= 1 && threshold <= size {
            let set = result.unwrap();
            prop_assert_eq!(set.threshold(), threshold);
            prop_assert_eq!(set.len(), size);
        } else {
            let is_invalid_threshold = matches!(result, Err(Error::InvalidThreshold { .. }));
            prop_assert!(is_invalid_threshold);
        }
    }
}
