//! Runtime configuration for the Reach protocol engine
//!
//! Mirrors the compile-time `reach-server.h` configuration of the reference
//! stack, but as an ordinary Rust value so a single binary can serve several
//! board variants. Service inclusion that the reference stack gates with
//! `INCLUDE_*_SERVICE` preprocessor flags is additionally exposed as Cargo
//! features (see `Cargo.toml`) for builds that want the service code
//! stripped entirely rather than merely disabled at runtime.

use serde::{Deserialize, Serialize};

/// Maximum encoded frame size. Tuned for a ~247-byte BLE MTU the way the
/// reference stack's `reach_ble_proto_sizes.h` is: `CR_CODED_BUFFER_SIZE`
/// stays comfortably under the bearer's MTU once link-layer overhead is
/// subtracted.
pub const CR_CODED_BUFFER_SIZE: usize = 244;

/// Payload budget once the envelope header is subtracted.
pub const CR_PAYLOAD_BUFFER_SIZE: usize = CR_CODED_BUFFER_SIZE - 4;

/// Largest chunk of file-transfer data carried in a single packet.
pub const REACH_BYTES_IN_A_FILE_PACKET: usize = 194;

/// Longest string value a parameter or its name/description/units may carry.
pub const REACH_PVAL_STRING_LEN: usize = 32;

/// Longest byte-array value a parameter may carry.
pub const REACH_PVAL_BYTES_LEN: usize = 32;

/// Maximum number of parameter ids accepted in a single filtered request.
pub const REACH_COUNT_PARAMS_IN_REQUEST: usize = 32;

/// Parameter descriptors packed per `DISCOVER_PARAMETERS` response.
pub const REACH_COUNT_PARAM_DESC_IN_RESPONSE: usize = 2;

/// Parameter values packed per `READ_PARAMETERS` response.
pub const REACH_COUNT_PARAM_READ_VALUES: usize = 4;

/// Parameter extension labels packed per `DISCOVER_PARAM_EX` response.
pub const REACH_COUNT_PARAM_EX_LABELS: usize = 8;

/// Default notification-slot table capacity; overridable per device via
/// [`ReachConfig::num_supported_param_notify`] up to this hard ceiling
/// (the slot table itself is a fixed-size array sized to this constant).
pub const NUM_SUPPORTED_PARAM_NOTIFY: usize = 8;

/// The three error-report verbosity profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorReportFormat {
    /// Local log only; nothing goes out over the wire.
    LogOnly,
    /// A tiny `{result_value, "Error N."}` notification.
    Short,
    /// A full formatted message, up to `REACH_BYTES_IN_A_FILE_PACKET - 1` chars.
    Full,
}

/// Runtime configuration for a [`crate::engine::ProtocolEngine`].
///
/// Values can be overridden via NVS/flash-backed storage or provisioning,
/// same division of responsibility as the pet-filter firmware's own
/// `SystemConfig`: `reach` only defines defaults and the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachConfig {
    /// Wire-format name for this build, e.g. `"my-device"` — reported verbatim
    /// as `DeviceInfoResponse::device_name`.
    pub device_name: heapless::String<32>,
    /// Reported as `DeviceInfoResponse::manufacturer_name`.
    pub manufacturer_name: heapless::String<24>,
    /// Reported as `DeviceInfoResponse::firmware_version`, a semver triple.
    pub firmware_version: heapless::String<16>,
    /// The Reach protocol version this engine implements, a semver triple.
    pub protocol_version: heapless::String<16>,

    /// Parameter service compiled in.
    pub include_parameter_service: bool,
    /// File-transfer service compiled in.
    pub include_file_service: bool,
    /// Command service compiled in.
    pub include_command_service: bool,
    /// Remote CLI service compiled in.
    pub include_cli_service: bool,
    /// Time service compiled in.
    pub include_time_service: bool,
    /// Stream (push-telemetry) service compiled in.
    pub include_stream_service: bool,
    /// WiFi provisioning service compiled in.
    pub include_wifi_service: bool,
    /// Reserved: no OTA message types are part of this protocol; always
    /// rejected with `NotImplemented` if ever set.
    pub include_ota_service: bool,

    /// Active capacity of the notification slot table, `<= NUM_SUPPORTED_PARAM_NOTIFY`.
    pub num_supported_param_notify: u8,
    /// Error-report verbosity.
    pub error_report_format: ErrorReportFormat,
    /// Whether a remote CLI session echoes input lines back by default.
    pub remote_cli_echo_on_default: bool,
    /// Default logger mask (see [`crate::logging`]).
    pub default_log_mask: u32,
    /// Opaque application-defined challenge key, if access is gated.
    /// `None` means every service is reachable without a challenge.
    pub app_required_challenge_key: Option<heapless::Vec<u8, 32>>,
}

fn fixed_str<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    let _ = out.push_str(s);
    out
}

impl Default for ReachConfig {
    fn default() -> Self {
        Self {
            device_name: fixed_str("reach-device"),
            manufacturer_name: fixed_str("unknown"),
            firmware_version: fixed_str("0.1.0"),
            protocol_version: fixed_str("1.0.0"),

            include_parameter_service: cfg!(feature = "param-service"),
            include_file_service: cfg!(feature = "file-service"),
            include_command_service: cfg!(feature = "command-service"),
            include_cli_service: cfg!(feature = "cli-service"),
            include_time_service: cfg!(feature = "time-service"),
            include_stream_service: cfg!(feature = "stream-service"),
            include_wifi_service: cfg!(feature = "wifi-service"),
            include_ota_service: false,

            num_supported_param_notify: NUM_SUPPORTED_PARAM_NOTIFY as u8,
            error_report_format: ErrorReportFormat::Short,
            remote_cli_echo_on_default: false,
            default_log_mask: crate::logging::LEVEL_WARN | crate::logging::LEVEL_ERROR,
            app_required_challenge_key: None,
        }
    }
}
