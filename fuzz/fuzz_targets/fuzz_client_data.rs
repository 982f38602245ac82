#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use warden_core::{
    testing::PasskeyFixture, Assertion, Challenge, CredentialRegistry, CurveSignature,
    SignatureVerifier, VerifierPolicy, WebAuthnAssertion,
};

#[derive(Debug, Arbitrary)]
struct Input {
    challenge: [u8; 32],
    r: [u8; 32],
    s: [u8; 32],
    authenticator_data: Vec<u8>,
    client_data_json: Vec<u8>,
    direct: bool,
    require_user_verification: bool,
}

fuzz_target!(|input: Input| {
    let passkey = PasskeyFixture::from_seed(1);
    let mut registry = CredentialRegistry::new();
    registry.register(passkey.public_key(), 0).unwrap();

    let policy = VerifierPolicy {
        expected_origin: Some("https://wallet.example".to_string()),
        rp_id: Some("wallet.example".to_string()),
        require_user_verification: input.require_user_verification,
    };
    let verifier = SignatureVerifier::new(&registry, &policy);

    let webauthn = WebAuthnAssertion::new(
        CurveSignature::from_scalars(input.r, input.s),
        input.authenticator_data,
        input.client_data_json,
    );
    let assertion = if input.direct {
        Assertion::Direct {
            credential_id: passkey.credential_id(),
            webauthn,
        }
    } else {
        Assertion::Scan { webauthn }
    };

    // Arbitrary bytes must never pass as a signature from the registered key
    let result = verifier.verify_request(&Challenge::new(input.challenge), &assertion);
    assert!(result.is_err());
});
