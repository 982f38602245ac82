//! Passkey signature verification
//!
//! Verification is a pure predicate over the credential registry. Cheap
//! rejections (unknown or inactive credential, malformed context, wrong
//! challenge) always happen before any curve arithmetic.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assertion::{Assertion, WebAuthnAssertion, WEBAUTHN_GET};
use crate::crypto::{sha256, CurveSignature};
use crate::error::{Error, Result};
use crate::registry::CredentialRegistry;
use crate::types::{Challenge, CredentialId};

/// Context checks applied to every passkey assertion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierPolicy {
    /// Required `clientDataJSON.origin`, if pinned
    #[serde(default)]
    pub expected_origin: Option<String>,

    /// Relying party id whose SHA256 must prefix the authenticator data
    #[serde(default)]
    pub rp_id: Option<String>,

    /// Require the user-verified flag, not just user presence
    #[serde(default)]
    pub require_user_verification: bool,
}

/// Successful verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedAssertion {
    /// Credential whose key produced the signature
    pub credential_id: CredentialId,

    /// Number of curve verifications performed
    pub curve_checks: usize,
}

/// Verifies assertions against the active credentials of one registry
pub struct SignatureVerifier<'a> {
    registry: &'a CredentialRegistry,
    policy: &'a VerifierPolicy,
}

impl<'a> SignatureVerifier<'a> {
    pub fn new(registry: &'a CredentialRegistry, policy: &'a VerifierPolicy) -> Self {
        Self { registry, policy }
    }

    /// Authorize a request: accepts the direct and scan passkey encodings
    pub fn verify_request(
        &self,
        challenge: &Challenge,
        assertion: &Assertion,
    ) -> Result<VerifiedAssertion> {
        match assertion {
            Assertion::Raw { .. } => Err(Error::MalformedSignature(
                "raw signatures cannot authorize requests".to_string(),
            )),
            _ => self.verify(challenge, assertion),
        }
    }

    /// Signature-validity query: additionally accepts raw curve signatures
    pub fn verify_signature(
        &self,
        hash: &Challenge,
        assertion: &Assertion,
    ) -> Result<VerifiedAssertion> {
        self.verify(hash, assertion)
    }

    fn verify(&self, challenge: &Challenge, assertion: &Assertion) -> Result<VerifiedAssertion> {
        let result = match assertion {
            Assertion::Direct {
                credential_id,
                webauthn,
            } => self.verify_direct(challenge, credential_id, webauthn),
            Assertion::Scan { webauthn } => {
                let digest = self.check_context(challenge, webauthn)?;
                self.scan(&digest, &webauthn.signature)
            }
            Assertion::Raw { signature } => self.scan(challenge.as_bytes(), signature),
        };

        match &result {
            Ok(verified) => debug!(
                credential = %verified.credential_id.short(),
                encoding = assertion.encoding(),
                curve_checks = verified.curve_checks,
                "Assertion verified"
            ),
            Err(e) => warn!(encoding = assertion.encoding(), error = %e, "Assertion rejected"),
        }
        result
    }

    /// One registry lookup, then exactly one curve check
    fn verify_direct(
        &self,
        challenge: &Challenge,
        credential_id: &CredentialId,
        webauthn: &WebAuthnAssertion,
    ) -> Result<VerifiedAssertion> {
        let credential = self
            .registry
            .lookup(credential_id)
            .ok()
            .filter(|c| c.can_sign())
            .ok_or_else(|| {
                Error::Unauthorized(format!("no active credential {}", credential_id.short()))
            })?;

        let digest = self.check_context(challenge, webauthn)?;

        credential
            .public_key
            .verify_prehash(&digest, &webauthn.signature)
            .map_err(|_| Error::Unauthorized("signature verification failed".to_string()))?;

        Ok(VerifiedAssertion {
            credential_id: credential.id,
            curve_checks: 1,
        })
    }

    /// Try every active credential in registration order; first match wins
    fn scan(&self, digest: &[u8; 32], signature: &CurveSignature) -> Result<VerifiedAssertion> {
        let mut curve_checks = 0;
        for credential in self.registry.iter_active().filter(|c| c.can_sign()) {
            curve_checks += 1;
            if credential.public_key.verify_prehash(digest, signature).is_ok() {
                return Ok(VerifiedAssertion {
                    credential_id: credential.id,
                    curve_checks,
                });
            }
        }
        Err(Error::Unauthorized(format!(
            "no active credential matched after {} checks",
            curve_checks
        )))
    }

    /// Validate the authenticator context and return the digest to verify
    fn check_context(&self, challenge: &Challenge, webauthn: &WebAuthnAssertion) -> Result<[u8; 32]> {
        let authenticator = webauthn.authenticator()?;
        let client = webauthn.client_data()?;

        if client.kind != WEBAUTHN_GET {
            return Err(Error::Unauthorized(format!(
                "unexpected client data type {:?}",
                client.kind
            )));
        }

        if client.challenge != challenge.to_base64url() {
            return Err(Error::Unauthorized(
                "client data challenge does not match request".to_string(),
            ));
        }

        if let Some(origin) = &self.policy.expected_origin {
            if &client.origin != origin {
                return Err(Error::Unauthorized(format!(
                    "unexpected origin {:?}",
                    client.origin
                )));
            }
        }

        if let Some(rp_id) = &self.policy.rp_id {
            if authenticator.rp_id_hash != sha256(rp_id.as_bytes()) {
                return Err(Error::Unauthorized("rpId hash mismatch".to_string()));
            }
        }

        if !authenticator.user_present() {
            return Err(Error::Unauthorized("user presence flag not set".to_string()));
        }

        if self.policy.require_user_verification && !authenticator.user_verified() {
            return Err(Error::Unauthorized(
                "user verification flag not set".to_string(),
            ));
        }

        Ok(webauthn.signed_digest())
    }
}
