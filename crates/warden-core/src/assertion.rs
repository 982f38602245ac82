//! Assertion encodings accepted by the signature verifier
//!
//! Submitters send one of three layouts, each prefixed by a tag byte:
//!
//! ```text
//! 0x00 RAW     r(32) | s(32)
//! 0x01 DIRECT  r(32) | s(32) | credential_id(32) | len(u16 BE) | authenticatorData | clientDataJSON
//! 0x02 SCAN    r(32) | s(32) |                    len(u16 BE) | authenticatorData | clientDataJSON
//! ```
//!
//! `DIRECT` names the credential and costs one curve check. `SCAN` is the
//! older layout without an id; it is tried against every active credential.
//! `RAW` is a bare curve signature and is only accepted by the
//! signature-validity query.

use serde::{Deserialize, Serialize};

use crate::crypto::{sha256, sha256_multi, CurveSignature};
use crate::error::{Error, Result};
use crate::types::{hex_vec, CredentialId};

pub const TAG_RAW: u8 = 0x00;
pub const TAG_DIRECT: u8 = 0x01;
pub const TAG_SCAN: u8 = 0x02;

/// rpIdHash (32) + flags (1) + signCount (4)
pub const AUTH_DATA_MIN_LEN: usize = 37;

pub const FLAG_USER_PRESENT: u8 = 0x01;
pub const FLAG_USER_VERIFIED: u8 = 0x04;

/// `clientDataJSON.type` for authentication ceremonies
pub const WEBAUTHN_GET: &str = "webauthn.get";

/// Decoded authorization proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum Assertion {
    /// Passkey assertion naming the credential that produced it
    Direct {
        credential_id: CredentialId,
        webauthn: WebAuthnAssertion,
    },

    /// Passkey assertion without a credential id
    Scan { webauthn: WebAuthnAssertion },

    /// Bare ECDSA signature over the challenge itself
    Raw { signature: CurveSignature },
}

impl Assertion {
    /// Name of the encoding, for logs
    pub fn encoding(&self) -> &'static str {
        match self {
            Assertion::Direct { .. } => "direct",
            Assertion::Scan { .. } => "scan",
            Assertion::Raw { .. } => "raw",
        }
    }

    /// Serialize to the tagged wire layout
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Assertion::Raw { signature } => {
                out.push(TAG_RAW);
                out.extend_from_slice(signature.as_bytes());
            }
            Assertion::Direct {
                credential_id,
                webauthn,
            } => {
                out.push(TAG_DIRECT);
                out.extend_from_slice(webauthn.signature.as_bytes());
                out.extend_from_slice(credential_id.as_bytes());
                webauthn.encode_context(&mut out)?;
            }
            Assertion::Scan { webauthn } => {
                out.push(TAG_SCAN);
                out.extend_from_slice(webauthn.signature.as_bytes());
                webauthn.encode_context(&mut out)?;
            }
        }
        Ok(out)
    }

    /// Parse the tagged wire layout
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| Error::MalformedSignature("empty assertion".to_string()))?;

        let mut reader = Reader::new(rest);
        let signature = CurveSignature::new(reader.array::<64>("signature")?);

        match tag {
            TAG_RAW => {
                reader.finish()?;
                Ok(Assertion::Raw { signature })
            }
            TAG_DIRECT => {
                let credential_id = CredentialId::new(reader.array::<32>("credential id")?);
                let webauthn = WebAuthnAssertion::decode_context(signature, &mut reader)?;
                Ok(Assertion::Direct {
                    credential_id,
                    webauthn,
                })
            }
            TAG_SCAN => {
                let webauthn = WebAuthnAssertion::decode_context(signature, &mut reader)?;
                Ok(Assertion::Scan { webauthn })
            }
            other => Err(Error::MalformedSignature(format!(
                "unknown assertion tag 0x{:02x}",
                other
            ))),
        }
    }
}

/// Signature plus the authenticator context it covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAuthnAssertion {
    pub signature: CurveSignature,

    #[serde(with = "hex_vec")]
    pub authenticator_data: Vec<u8>,

    #[serde(with = "hex_vec")]
    pub client_data_json: Vec<u8>,
}

impl WebAuthnAssertion {
    pub fn new(
        signature: CurveSignature,
        authenticator_data: Vec<u8>,
        client_data_json: Vec<u8>,
    ) -> Self {
        Self {
            signature,
            authenticator_data,
            client_data_json,
        }
    }

    /// Digest the authenticator signed: SHA256(authData || SHA256(clientDataJSON))
    pub fn signed_digest(&self) -> [u8; 32] {
        let client_data_hash = sha256(&self.client_data_json);
        sha256_multi(&[&self.authenticator_data, &client_data_hash])
    }

    /// Parse the client-supplied context document
    pub fn client_data(&self) -> Result<ClientData> {
        serde_json::from_slice(&self.client_data_json)
            .map_err(|e| Error::MalformedSignature(format!("client data: {}", e)))
    }

    /// Fixed-position fields of the authenticator data
    pub fn authenticator(&self) -> Result<AuthenticatorData> {
        AuthenticatorData::parse(&self.authenticator_data)
    }

    fn encode_context(&self, out: &mut Vec<u8>) -> Result<()> {
        let len = u16::try_from(self.authenticator_data.len()).map_err(|_| {
            Error::MalformedSignature("authenticator data longer than 65535 bytes".to_string())
        })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&self.authenticator_data);
        out.extend_from_slice(&self.client_data_json);
        Ok(())
    }

    fn decode_context(signature: CurveSignature, reader: &mut Reader<'_>) -> Result<Self> {
        let len = u16::from_be_bytes(reader.array::<2>("authenticator data length")?);
        let authenticator_data = reader.take(len as usize, "authenticator data")?.to_vec();
        let client_data_json = reader.rest().to_vec();

        if client_data_json.is_empty() {
            return Err(Error::MalformedSignature(
                "missing client data".to_string(),
            ));
        }

        Ok(Self::new(signature, authenticator_data, client_data_json))
    }
}

/// Fields of `clientDataJSON` the verifier checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientData {
    #[serde(rename = "type")]
    pub kind: String,

    /// base64url (unpadded) of the challenge the authenticator signed
    pub challenge: String,

    pub origin: String,

    #[serde(rename = "crossOrigin", default)]
    pub cross_origin: bool,
}

/// Fixed-position prefix of WebAuthn authenticator data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
}

impl AuthenticatorData {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < AUTH_DATA_MIN_LEN {
            return Err(Error::MalformedSignature(format!(
                "authenticator data too short: {} bytes",
                bytes.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[..32]);
        let mut count = [0u8; 4];
        count.copy_from_slice(&bytes[33..37]);

        Ok(Self {
            rp_id_hash,
            flags: bytes[32],
            sign_count: u32::from_be_bytes(count),
        })
    }

    pub fn user_present(&self) -> bool {
        self.flags & FLAG_USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & FLAG_USER_VERIFIED != 0
    }
}

/// Bounds-checked cursor over an encoded assertion
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(Error::MalformedSignature(format!(
                "truncated {}: need {} bytes, have {}",
                what,
                len,
                self.bytes.len()
            )));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.bytes)
    }

    fn finish(&self) -> Result<()> {
        if !self.bytes.is_empty() {
            return Err(Error::MalformedSignature(format!(
                "{} trailing bytes",
                self.bytes.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_webauthn() -> WebAuthnAssertion {
        let mut auth_data = vec![0u8; 37];
        auth_data[32] = FLAG_USER_PRESENT | FLAG_USER_VERIFIED;
        WebAuthnAssertion::new(
            CurveSignature::from_scalars([1u8; 32], [2u8; 32]),
            auth_data,
            br#"{"type":"webauthn.get","challenge":"abc","origin":"https://wallet.example"}"#
                .to_vec(),
        )
    }

    #[test]
    fn test_direct_layout() {
        let credential_id = CredentialId::new([9u8; 32]);
        let assertion = Assertion::Direct {
            credential_id,
            webauthn: sample_webauthn(),
        };
        let bytes = assertion.encode().unwrap();

        assert_eq!(bytes[0], TAG_DIRECT);
        assert_eq!(&bytes[65..97], credential_id.as_bytes());
        assert_eq!(u16::from_be_bytes([bytes[97], bytes[98]]), 37);
        assert_eq!(Assertion::decode(&bytes).unwrap(), assertion);
    }

    #[test]
    fn test_raw_rejects_trailing_bytes() {
        let mut bytes = vec![TAG_RAW];
        bytes.extend_from_slice(&[5u8; 64]);
        assert!(Assertion::decode(&bytes).is_ok());

        bytes.push(0);
        assert!(matches!(
            Assertion::decode(&bytes),
            Err(Error::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_truncated_inputs_are_malformed() {
        let bytes = Assertion::Scan {
            webauthn: sample_webauthn(),
        }
        .encode()
        .unwrap();

        // Every strict prefix that cuts into the fixed fields must be rejected
        for len in 0..(1 + 64 + 2 + 37) {
            assert!(
                matches!(
                    Assertion::decode(&bytes[..len]),
                    Err(Error::MalformedSignature(_))
                ),
                "prefix of {} bytes decoded",
                len
            );
        }
    }

    #[test]
    fn test_unknown_tag() {
        let mut bytes = vec![0x7f];
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            Assertion::decode(&bytes),
            Err(Error::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_client_data_parsing() {
        let client = sample_webauthn().client_data().unwrap();
        assert_eq!(client.kind, WEBAUTHN_GET);
        assert_eq!(client.challenge, "abc");
        assert!(!client.cross_origin);

        let mut broken = sample_webauthn();
        broken.client_data_json = b"not json".to_vec();
        assert!(matches!(
            broken.client_data(),
            Err(Error::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_authenticator_flags() {
        let data = sample_webauthn().authenticator().unwrap();
        assert!(data.user_present());
        assert!(data.user_verified());

        assert!(matches!(
            AuthenticatorData::parse(&[0u8; 36]),
            Err(Error::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_signed_digest_binds_client_data() {
        let a = sample_webauthn();
        let mut b = sample_webauthn();
        b.client_data_json.push(b' ');
        assert_ne!(a.signed_digest(), b.signed_digest());
    }
}
