//! Codec (C1) and framing (C2): the wire <-> typed-message boundary.

pub mod proto;
pub mod sanitize;
pub mod wire;
