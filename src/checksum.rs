//! RFC 1071 16-bit Internet Checksum, used by the file-transfer engine when
//! `use_checksum` is set on a transfer.
//!
//! Big-endian word pairing, one's-complement sum, final one's complement.
//! An odd trailing byte is padded as the high byte of its word.

pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);

    for pair in &mut chunks {
        let word = u16::from_be_bytes([pair[0], pair[1]]);
        sum += u32::from(word);
    }

    if let [last] = *chunks.remainder() {
        sum += u32::from(last) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}
