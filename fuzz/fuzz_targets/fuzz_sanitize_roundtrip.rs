//! Fuzz target: `codec::sanitize::sanitize_utf8`
//!
//! Every string crossing the wire boundary passes through this sanitizer
//! first. Checks it never panics on arbitrary bytes, always returns valid
//! UTF-8, and never exceeds the requested byte budget.
//!
//! cargo fuzz run fuzz_sanitize_roundtrip

#![no_main]

use libfuzzer_sys::fuzz_target;
use reach::codec::sanitize::sanitize_utf8;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let max_bytes = 1 + (data[0] as usize % 64);
    let out = sanitize_utf8(&data[1.min(data.len())..], max_bytes);
    assert!(out.len() <= max_bytes, "sanitizer exceeded requested byte budget");
    assert!(std::str::from_utf8(out.as_bytes()).is_ok(), "sanitizer produced invalid utf-8");
});
