//! Envelope framing (C2): discriminates the Classic and Ahsoka wire forms
//! and converts between them and the uniform internal `Header`.
//!
//! - **Classic**: a single length-delimited protobuf `Message{header,
//!   payload}`. Its encoded form starts with a field-1, length-delimited
//!   tag byte (`0x0A`) followed by the header sub-message's length, which
//!   is how it's told apart from Ahsoka.
//! - **Ahsoka**: a 16-bit little-endian length prefix for a header-only
//!   protobuf block, followed by that many header bytes, followed by the
//!   payload bytes with no further framing.
//!
//! The classic discriminator (`first byte == 0x0A && second byte != 0x00`)
//! is a heuristic inherited from the reference stack: it assumes field 1
//! (the header) is always present and non-empty. Behavior for a malformed
//! first byte that satisfies neither form is not specified upstream; here
//! it falls through to the Ahsoka decoder, which will itself fail with
//! `DecodingFailed` if the bytes don't parse as a header.

use prost::Message as _;

use crate::codec::proto::{self, Header};
use crate::error::{ReachError, Result};

/// Which wire form an envelope used. Replies always echo the form of the
/// most recent prompt (Ahsoka after the device-info handshake, in a typical
/// client).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeForm {
    Classic,
    Ahsoka,
}

/// A decoded envelope: the uniform header plus the still-encoded payload
/// bytes, ready for `decode_payload` by the dispatcher once it knows the
/// payload's concrete message type.
pub struct DecodedEnvelope {
    pub header: Header,
    pub payload: Vec<u8>,
    pub form: EnvelopeForm,
}

pub fn detect_form(frame: &[u8]) -> EnvelopeForm {
    if frame.len() >= 2 && frame[0] == 0x0A && frame[1] != 0x00 {
        EnvelopeForm::Classic
    } else {
        EnvelopeForm::Ahsoka
    }
}

/// Decode a complete frame into its header and opaque payload bytes.
pub fn decode_envelope(frame: &[u8]) -> Result<DecodedEnvelope> {
    match detect_form(frame) {
        EnvelopeForm::Classic => {
            let msg = proto::Message::decode(frame).map_err(|_| ReachError::DecodingFailed)?;
            let header = msg.header.ok_or(ReachError::DecodingFailed)?;
            Ok(DecodedEnvelope {
                header,
                payload: msg.payload,
                form: EnvelopeForm::Classic,
            })
        }
        EnvelopeForm::Ahsoka => {
            if frame.len() < 2 {
                return Err(ReachError::DecodingFailed);
            }
            let header_len = u16::from_le_bytes([frame[0], frame[1]]) as usize;
            let header_start = 2;
            let header_end = header_start
                .checked_add(header_len)
                .ok_or(ReachError::DecodingFailed)?;
            if header_end > frame.len() {
                return Err(ReachError::DecodingFailed);
            }
            let header = Header::decode(&frame[header_start..header_end])
                .map_err(|_| ReachError::DecodingFailed)?;
            let payload = frame[header_end..].to_vec();
            Ok(DecodedEnvelope {
                header,
                payload,
                form: EnvelopeForm::Ahsoka,
            })
        }
    }
}

/// Encode `header` and an already-encoded `payload` into `out` using the
/// given envelope form. Returns the number of bytes written.
pub fn encode_envelope(
    header: &Header,
    payload: &[u8],
    form: EnvelopeForm,
    out: &mut [u8],
) -> Result<usize> {
    match form {
        EnvelopeForm::Classic => {
            let msg = proto::Message {
                header: Some(header.clone()),
                payload: payload.to_vec(),
            };
            proto::encode_into(&msg, out)
        }
        EnvelopeForm::Ahsoka => {
            let header_len = header.encoded_len();
            if header_len > u16::MAX as usize {
                return Err(ReachError::EncodingFailed);
            }
            let total = 2 + header_len + payload.len();
            if total > out.len() {
                return Err(ReachError::BufferTooSmall);
            }
            out[..2].copy_from_slice(&(header_len as u16).to_le_bytes());
            let mut cursor: &mut [u8] = &mut out[2..2 + header_len];
            header
                .encode(&mut cursor)
                .map_err(|_| ReachError::EncodingFailed)?;
            out[2 + header_len..total].copy_from_slice(payload);
            Ok(total)
        }
    }
}
