//! Deterministic passkey authenticator for tests
//!
//! Produces real P-256 WebAuthn assertions so tests exercise the same
//! verification path as production requests.

use p256::ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey};

use crate::assertion::{Assertion, WebAuthnAssertion, FLAG_USER_PRESENT, FLAG_USER_VERIFIED, WEBAUTHN_GET};
use crate::crypto::{sha256, CurveSignature, PasskeyPublicKey};
use crate::types::{Challenge, CredentialId};

pub const TEST_ORIGIN: &str = "https://wallet.example";
pub const TEST_RP_ID: &str = "wallet.example";

/// Simulated authenticator holding one P-256 private key
#[derive(Clone)]
pub struct PasskeyFixture {
    signing_key: SigningKey,
}

impl PasskeyFixture {
    /// Same seed, same key
    pub fn from_seed(seed: u8) -> Self {
        let mut scalar = [0u8; 32];
        scalar[30] = 0x01;
        scalar[31] = seed;
        let signing_key = SigningKey::from_slice(&scalar).expect("scalar in range");
        Self { signing_key }
    }

    pub fn public_key(&self) -> PasskeyPublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let mut qx = [0u8; 32];
        let mut qy = [0u8; 32];
        qx.copy_from_slice(point.x().expect("uncompressed point"));
        qy.copy_from_slice(point.y().expect("uncompressed point"));
        PasskeyPublicKey::new(qx, qy)
    }

    pub fn credential_id(&self) -> CredentialId {
        self.public_key().credential_id()
    }

    /// Low-s ECDSA signature over a prehashed digest
    pub fn sign_digest(&self, digest: &[u8; 32]) -> CurveSignature {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest)
            .expect("prehash signing");
        let signature = signature.normalize_s().unwrap_or(signature);

        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&signature.to_bytes());
        CurveSignature::new(bytes)
    }

    /// Full authenticator response for `challenge`
    pub fn webauthn(&self, challenge: &Challenge, flags: u8, origin: &str) -> WebAuthnAssertion {
        let mut authenticator_data = sha256(TEST_RP_ID.as_bytes()).to_vec();
        authenticator_data.push(flags);
        authenticator_data.extend_from_slice(&1u32.to_be_bytes());

        let client_data_json = serde_json::to_vec(&serde_json::json!({
            "type": WEBAUTHN_GET,
            "challenge": challenge.to_base64url(),
            "origin": origin,
            "crossOrigin": false,
        }))
        .expect("client data serializes");

        let mut assertion =
            WebAuthnAssertion::new(CurveSignature::new([0u8; 64]), authenticator_data, client_data_json);
        assertion.signature = self.sign_digest(&assertion.signed_digest());
        assertion
    }

    pub fn direct(&self, challenge: &Challenge) -> Assertion {
        self.direct_with_flags(challenge, FLAG_USER_PRESENT | FLAG_USER_VERIFIED)
    }

    pub fn direct_with_flags(&self, challenge: &Challenge, flags: u8) -> Assertion {
        Assertion::Direct {
            credential_id: self.credential_id(),
            webauthn: self.webauthn(challenge, flags, TEST_ORIGIN),
        }
    }

    pub fn scan(&self, challenge: &Challenge) -> Assertion {
        Assertion::Scan {
            webauthn: self.webauthn(challenge, FLAG_USER_PRESENT | FLAG_USER_VERIFIED, TEST_ORIGIN),
        }
    }

    /// Bare signature over `hash`, for the signature-validity query
    pub fn raw(&self, hash: &Challenge) -> Assertion {
        Assertion::Raw {
            signature: self.sign_digest(hash.as_bytes()),
        }
    }
}
