//! Fuzz target: `codec::wire::decode_envelope`
//!
//! Drives arbitrary byte sequences into the envelope decoder and asserts
//! that it never panics on either wire form (Classic or Ahsoka), and that a
//! successful decode never reports a payload longer than the input itself.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use reach::codec::wire::decode_envelope;

fuzz_target!(|data: &[u8]| {
    if let Ok(decoded) = decode_envelope(data) {
        assert!(decoded.payload.len() <= data.len(), "payload longer than input frame");
    }
});
