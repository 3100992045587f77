//! Fuzz target for Inbound::decode
//!
//! Feeds arbitrary text to the inbound decoder to find:
//! - Panics on malformed JSON or unexpected field types
//! - Messages that decode but fail to re-encode
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use meadow_proto::Inbound;

fuzz_target!(|data: &str| {
    let Ok(message) = Inbound::decode(data) else {
        return;
    };

    // Anything accepted must survive a round trip with the same kind
    let encoded = message.encode().expect("decoded message must re-encode");
    let again = Inbound::decode(&encoded).expect("re-encoded message must decode");
    assert_eq!(message.kind(), again.kind());
});
