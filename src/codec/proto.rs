//! Generated protobuf types for every message named in `proto/reach.proto`,
//! plus the thin encode/decode helpers the rest of the codec builds on.

#![allow(clippy::all)]

include!(concat!(env!("OUT_DIR"), "/reach.rs"));

use crate::error::{ReachError, Result};

/// Decode a typed payload from raw protobuf bytes.
pub fn decode<M: prost::Message + Default>(bytes: &[u8]) -> Result<M> {
    M::decode(bytes).map_err(|_| ReachError::DecodingFailed)
}

/// Encode a typed payload into `out`, returning the number of bytes written.
pub fn encode_into(msg: &impl prost::Message, out: &mut [u8]) -> Result<usize> {
    let len = msg.encoded_len();
    if len > out.len() {
        return Err(ReachError::BufferTooSmall);
    }
    let mut cursor: &mut [u8] = out;
    msg.encode(&mut cursor)
        .map_err(|_| ReachError::EncodingFailed)?;
    Ok(len)
}
