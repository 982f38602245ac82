//! Cryptographic primitives for Warden
//!
//! Passkeys are P-256 (secp256r1) public keys stored as raw affine
//! coordinates. Signatures are ECDSA `r || s` checked against a 32-byte
//! prehashed digest.

use p256::{
    ecdsa::{signature::hazmat::PrehashVerifier, Signature as P256Signature, VerifyingKey},
    EncodedPoint, FieldBytes,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::{hex_bytes_32, CredentialId};

/// Uncompressed P-256 public key as affine coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PasskeyPublicKey {
    #[serde(with = "hex_bytes_32")]
    pub qx: [u8; 32],
    #[serde(with = "hex_bytes_32")]
    pub qy: [u8; 32],
}

impl PasskeyPublicKey {
    pub fn new(qx: [u8; 32], qy: [u8; 32]) -> Self {
        Self { qx, qy }
    }

    /// Both coordinates zero; never a valid stored key
    pub fn is_zero(&self) -> bool {
        self.qx == [0u8; 32] && self.qy == [0u8; 32]
    }

    /// Compute the CredentialId (SHA256 of qx || qy)
    ///
    /// Pure function of the coordinates, so submitters can derive it offline.
    pub fn credential_id(&self) -> CredentialId {
        CredentialId::new(sha256_multi(&[&self.qx, &self.qy]))
    }

    /// Reject the zero key and points that are not on the curve
    pub fn validate(&self) -> Result<()> {
        if self.is_zero() {
            return Err(Error::InvalidKey("zero public key".to_string()));
        }
        self.verifying_key().map(|_| ())
    }

    fn verifying_key(&self) -> Result<VerifyingKey> {
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&self.qx),
            FieldBytes::from_slice(&self.qy),
            false,
        );
        VerifyingKey::from_encoded_point(&point)
            .map_err(|e| Error::InvalidKey(format!("point not on curve: {}", e)))
    }

    /// Verify an ECDSA signature over a 32-byte digest
    ///
    /// High-`s` signatures are rejected so each authorization has exactly one
    /// valid encoding.
    pub fn verify_prehash(&self, digest: &[u8; 32], signature: &CurveSignature) -> Result<()> {
        let verifying_key = self.verifying_key()?;

        let sig = P256Signature::from_slice(signature.as_bytes())
            .map_err(|_| Error::Unauthorized("signature scalars out of range".to_string()))?;
        if sig.normalize_s().is_some() {
            return Err(Error::Unauthorized("non-canonical high-s signature".to_string()));
        }

        verifying_key
            .verify_prehash(digest, &sig)
            .map_err(|_| Error::Unauthorized("signature verification failed".to_string()))
    }
}

/// ECDSA signature (64 bytes: r || s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveSignature(pub [u8; 64]);

impl CurveSignature {
    pub const SIZE: usize = 64;

    pub fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn from_scalars(r: [u8; 32], s: [u8; 32]) -> Self {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&r);
        bytes[32..].copy_from_slice(&s);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Get the r component
    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    /// Get the s component
    pub fn s(&self) -> &[u8] {
        &self.0[32..]
    }
}

impl Serialize for CurveSignature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for CurveSignature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 64];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

/// Hash data using SHA256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple pieces of data using SHA256
pub fn sha256_multi(data: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for d in data {
        hasher.update(d);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_key_rejected() {
        let key = PasskeyPublicKey::new([0u8; 32], [0u8; 32]);
        assert!(key.is_zero());
        assert!(matches!(key.validate(), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_off_curve_key_rejected() {
        let key = PasskeyPublicKey::new([1u8; 32], [2u8; 32]);
        assert!(!key.is_zero());
        assert!(matches!(key.validate(), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_credential_id_is_hash_of_coordinates() {
        let key = PasskeyPublicKey::new([3u8; 32], [4u8; 32]);
        let expected = sha256(&[[3u8; 32], [4u8; 32]].concat());
        assert_eq!(key.credential_id().as_bytes(), &expected);
    }

    #[test]
    fn test_signature_components() {
        let sig = CurveSignature::from_scalars([0xaa; 32], [0xbb; 32]);
        assert_eq!(sig.r(), &[0xaa; 32]);
        assert_eq!(sig.s(), &[0xbb; 32]);
    }
}
