//! Access gate: challenge-key validation and per-object authorization.

use crate::callbacks::{AccessCallbacks, ServiceId};
use crate::codec::proto::MessageType;
use crate::error::{ReachError, Result};

/// `GET_DEVICE_INFO` is the one message type reachable without a valid
/// challenge key — it returns a diminished response and records the
/// client's declared protocol version for compatibility.
fn is_public(message_type: MessageType) -> bool {
    matches!(message_type, MessageType::GetDeviceInfo)
}

/// Stateless gate: both checks simply consult the application's
/// [`AccessCallbacks`] implementation, which owns whatever challenge-key
/// bookkeeping it needs.
pub struct AccessGate;

impl AccessGate {
    /// Whole-service entry check, run before a handler is invoked.
    pub fn check_service<A: AccessCallbacks + ?Sized>(
        access: &A,
        message_type: MessageType,
    ) -> Result<()> {
        if is_public(message_type) || access.challenge_key_is_valid() {
            Ok(())
        } else {
            Err(ReachError::ChallengeFailed)
        }
    }

    /// Per-object authorization check (parameter id, file id, command id).
    pub fn check_object<A: AccessCallbacks + ?Sized>(
        access: &A,
        service: ServiceId,
        object_id: u32,
    ) -> Result<()> {
        if access.access_granted(service, object_id) {
            Ok(())
        } else {
            Err(ReachError::PermissionDenied)
        }
    }
}
