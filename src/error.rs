//! Unified error types for the Reach protocol runtime.
//!
//! A single `ReachError` enum that every subsystem converts into, keeping
//! the dispatcher's error handling uniform. Each variant maps 1:1 onto a
//! wire `ErrorCode` so a `ReachError` can always be reported to the client
//! verbatim.

use core::fmt;

use crate::codec::proto::ErrorCode;

/// Every fallible operation in the protocol runtime funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachError {
    NoData,
    NoResponse,
    DecodingFailed,
    EncodingFailed,
    InvalidState,
    InvalidParameter,
    InvalidId,
    PermissionDenied,
    ChallengeFailed,
    ReadFailed,
    WriteFailed,
    BufferTooSmall,
    BadFile,
    PacketCountErr,
    ChecksumMismatch,
    NotImplemented,
    NoService,
    NoResource,
    Incomplete,
}

impl fmt::Display for ReachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no data"),
            Self::NoResponse => write!(f, "no response"),
            Self::DecodingFailed => write!(f, "decoding failed"),
            Self::EncodingFailed => write!(f, "encoding failed"),
            Self::InvalidState => write!(f, "invalid state"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::InvalidId => write!(f, "invalid id"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::ChallengeFailed => write!(f, "challenge failed"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::BadFile => write!(f, "bad file"),
            Self::PacketCountErr => write!(f, "packet count error"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::NotImplemented => write!(f, "not implemented"),
            Self::NoService => write!(f, "no service"),
            Self::NoResource => write!(f, "no resource"),
            Self::Incomplete => write!(f, "incomplete"),
        }
    }
}

impl ReachError {
    /// The wire `ErrorCode` this error reports as.
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::NoData => ErrorCode::NoData,
            Self::NoResponse => ErrorCode::NoResponse,
            Self::DecodingFailed => ErrorCode::DecodingFailed,
            Self::EncodingFailed => ErrorCode::EncodingFailed,
            Self::InvalidState => ErrorCode::InvalidState,
            Self::InvalidParameter => ErrorCode::InvalidParameter,
            Self::InvalidId => ErrorCode::InvalidId,
            Self::PermissionDenied => ErrorCode::PermissionDenied,
            Self::ChallengeFailed => ErrorCode::ChallengeFailed,
            Self::ReadFailed => ErrorCode::ReadFailed,
            Self::WriteFailed => ErrorCode::WriteFailed,
            Self::BufferTooSmall => ErrorCode::BufferTooSmall,
            Self::BadFile => ErrorCode::BadFile,
            Self::PacketCountErr => ErrorCode::PacketCountErr,
            Self::ChecksumMismatch => ErrorCode::ChecksumMismatch,
            Self::NotImplemented => ErrorCode::NotImplemented,
            Self::NoService => ErrorCode::NoService,
            Self::NoResource => ErrorCode::NoResource,
            Self::Incomplete => ErrorCode::Incomplete,
        }
    }

    /// Recover a `ReachError` from a wire `ErrorCode`, if it represents one
    /// (`NoError` is success, not an error, and has no `ReachError` form).
    pub const fn from_code(code: ErrorCode) -> Option<Self> {
        match code {
            ErrorCode::NoError => None,
            ErrorCode::NoData => Some(Self::NoData),
            ErrorCode::NoResponse => Some(Self::NoResponse),
            ErrorCode::DecodingFailed => Some(Self::DecodingFailed),
            ErrorCode::EncodingFailed => Some(Self::EncodingFailed),
            ErrorCode::InvalidState => Some(Self::InvalidState),
            ErrorCode::InvalidParameter => Some(Self::InvalidParameter),
            ErrorCode::InvalidId => Some(Self::InvalidId),
            ErrorCode::PermissionDenied => Some(Self::PermissionDenied),
            ErrorCode::ChallengeFailed => Some(Self::ChallengeFailed),
            ErrorCode::ReadFailed => Some(Self::ReadFailed),
            ErrorCode::WriteFailed => Some(Self::WriteFailed),
            ErrorCode::BufferTooSmall => Some(Self::BufferTooSmall),
            ErrorCode::BadFile => Some(Self::BadFile),
            ErrorCode::PacketCountErr => Some(Self::PacketCountErr),
            ErrorCode::ChecksumMismatch => Some(Self::ChecksumMismatch),
            ErrorCode::NotImplemented => Some(Self::NotImplemented),
            ErrorCode::NoService => Some(Self::NoService),
            ErrorCode::NoResource => Some(Self::NoResource),
            ErrorCode::Incomplete => Some(Self::Incomplete),
        }
    }
}

/// Protocol-runtime-wide `Result` alias.
pub type Result<T> = core::result::Result<T, ReachError>;
