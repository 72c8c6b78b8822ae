//! Application callback surface.
//!
//! Models the reference stack's "weak symbol" callback surface as a set of
//! traits the engine is generic over — the same hexagonal split the
//! reference firmware draws with `SensorPort`/`ActuatorPort`/`EventSink`.
//! One trait per concern, composed into [`ReachCallbacks`]; a device
//! implements only the services it compiles in and leaves the rest at
//! their default (`NotImplemented`/empty) bodies.

use crate::codec::proto::{
    CommandInfo, DeviceInfoRequest, DeviceInfoResponse, FileInfo, ParamExLabel, ParameterInfo,
    ParameterValue, WifiInfo,
};
use crate::error::{ReachError, Result};

/// Identifies which service an `access_granted` check is gating, so one
/// callback can cover every per-object authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceId {
    Parameter,
    File,
    Command,
    Cli,
    Time,
    Wifi,
}

pub trait TransportCallbacks {
    /// `true` once the bearer (BLE link, socket, ...) is connected. The
    /// dispatcher's `process(tick)` does nothing while this is `false`.
    fn is_connected(&self) -> bool;

    /// Pull the next coded prompt frame into `buf`, if one is queued.
    /// Returns the number of bytes written.
    fn get_coded_prompt(&mut self, buf: &mut [u8]) -> Option<usize>;

    /// Hand a fully encoded frame to the transport to send.
    fn send_coded_response(&mut self, buf: &[u8]) -> Result<()>;
}

pub trait AccessCallbacks {
    /// Whole-service gate: `false` blocks every service but device-info.
    fn challenge_key_is_valid(&self) -> bool {
        true
    }

    /// Per-object gate (parameter id, file id, command id, ...).
    fn access_granted(&self, _service: ServiceId, _object_id: u32) -> bool {
        true
    }

    /// Called on transport connect to reset the challenge state.
    fn invalidate_challenge_key(&mut self) {}
}

pub trait DeviceInfoCallbacks {
    fn device_get_info(&self, request: &DeviceInfoRequest) -> DeviceInfoResponse;

    fn ping_get_signal_strength(&self) -> i32 {
        0
    }
}

pub trait ParameterCallbacks {
    fn parameter_get_count(&self) -> u32 {
        0
    }
    fn discover_reset(&mut self, _filter: &[u32]) {}
    fn discover_next(&mut self) -> Option<ParameterInfo> {
        None
    }
    fn ex_get_count(&self, _pid: u32) -> u32 {
        0
    }
    fn ex_discover_reset(&mut self, _pid: u32) {}
    fn ex_discover_next(&mut self) -> Option<ParamExLabel> {
        None
    }
    fn parameter_read(&self, _pid: u32) -> Result<ParameterValue> {
        Err(ReachError::NotImplemented)
    }
    fn parameter_write(&mut self, _value: &ParameterValue) -> Result<()> {
        Err(ReachError::NotImplemented)
    }
    fn compute_parameter_hash(&self) -> u32 {
        0
    }
}

pub trait FileCallbacks {
    fn file_get_file_count(&self) -> u32 {
        0
    }
    fn file_discover_reset(&mut self, _fid_filter: Option<u32>) {}
    fn file_discover_next(&mut self) -> Option<FileInfo> {
        None
    }
    fn file_get_description(&self, _fid: u32) -> Option<FileInfo> {
        None
    }
    fn file_get_preferred_ack_rate(&self, _fid: u32, requested: u32, _is_write: bool) -> u32 {
        requested
    }
    fn read_file(&mut self, _fid: u32, _offset: u32, _buf: &mut [u8]) -> Result<usize> {
        Err(ReachError::NotImplemented)
    }
    fn write_file(&mut self, _fid: u32, _offset: u32, _data: &[u8]) -> Result<()> {
        Err(ReachError::NotImplemented)
    }
    fn file_prepare_to_write(&mut self, _fid: u32, _offset: u32, _length: u32) -> Result<()> {
        Err(ReachError::NotImplemented)
    }
    fn erase_file(&mut self, _fid: u32) -> Result<()> {
        Err(ReachError::NotImplemented)
    }
    fn file_transfer_complete(&mut self, _fid: u32) -> Result<()> {
        Ok(())
    }
}

pub trait CommandCallbacks {
    fn get_command_count(&self) -> u32 {
        0
    }
    fn command_discover_reset(&mut self) {}
    fn command_discover_next(&mut self) -> Option<CommandInfo> {
        None
    }
    fn command_execute(&mut self, _cid: u32) -> Result<()> {
        Err(ReachError::NotImplemented)
    }
}

pub trait CliCallbacks {
    /// Forward an inbound `CLI_NOTIFICATION` line to the device's CLI
    /// backend. There is no synchronous response; any output is pushed
    /// later via [`crate::engine::ProtocolEngine::emit_cli_line`].
    fn cli_enter(&mut self, _line: &str) -> Result<()> {
        Err(ReachError::NotImplemented)
    }
}

pub trait TimeCallbacks {
    fn time_get(&self) -> u64 {
        0
    }
    fn time_set(&mut self, _utc_seconds: u64) -> Result<()> {
        Err(ReachError::NotImplemented)
    }
}

pub trait WifiCallbacks {
    fn wifi_discover_reset(&mut self) {}
    fn wifi_discover_next(&mut self) -> Option<WifiInfo> {
        None
    }
    fn wifi_connection(&mut self, _ssid: &str, _passphrase: &str) -> Result<()> {
        Err(ReachError::NotImplemented)
    }
}

/// The full callback surface a device implements once and hands to
/// [`crate::engine::ProtocolEngine::new`].
pub trait ReachCallbacks:
    TransportCallbacks
    + AccessCallbacks
    + DeviceInfoCallbacks
    + ParameterCallbacks
    + FileCallbacks
    + CommandCallbacks
    + CliCallbacks
    + TimeCallbacks
    + WifiCallbacks
{
}

impl<T> ReachCallbacks for T where
    T: TransportCallbacks
        + AccessCallbacks
        + DeviceInfoCallbacks
        + ParameterCallbacks
        + FileCallbacks
        + CommandCallbacks
        + CliCallbacks
        + TimeCallbacks
        + WifiCallbacks
{
}
