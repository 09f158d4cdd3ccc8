//! Fuzz target for `ServerEvent::decode`.
//!
//! Arbitrary text must decode to an event or an error, never a panic. Events
//! that decode must survive an encode/decode cycle unchanged.

#![no_main]

use gigchat_proto::ServerEvent;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(event) = ServerEvent::decode(text) else {
        return;
    };
    let encoded = event.encode().unwrap();
    assert_eq!(ServerEvent::decode(&encoded).unwrap(), event);
});
