//! Single-pass UTF-8 sanitizer.
//!
//! Device-specific callbacks (file names on a raw filesystem, CLI lines
//! from a serial backend, parameter descriptors loaded from flash) may hand
//! the engine bytes that are not valid UTF-8. Every string that crosses the
//! wire boundary is scrubbed through here first, so the codec never
//! produces a malformed protobuf `string` field.

/// Replace malformed multi-byte sequences with the standard replacement
/// character and truncate to `max_bytes`, always on a char boundary.
pub fn sanitize_utf8(input: &[u8], max_bytes: usize) -> String {
    let lossy = String::from_utf8_lossy(input);
    truncate_to_char_boundary(&lossy, max_bytes)
}

fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
