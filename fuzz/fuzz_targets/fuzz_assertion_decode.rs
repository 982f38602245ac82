#![no_main]

use libfuzzer_sys::fuzz_target;
use warden_core::{Assertion, Error};

fuzz_target!(|data: &[u8]| {
    match Assertion::decode(data) {
        Ok(assertion) => {
            // Anything that decodes must re-encode to the same bytes
            let reencoded = assertion.encode().unwrap();
            assert_eq!(reencoded, data);

            if let Assertion::Direct { webauthn, .. } | Assertion::Scan { webauthn } = &assertion {
                // Parsing the embedded context must not panic
                let _ = webauthn.client_data();
                let _ = webauthn.authenticator();
                let _ = webauthn.signed_digest();
            }
        }
        Err(e) => assert!(matches!(e, Error::MalformedSignature(_))),
    }
});
