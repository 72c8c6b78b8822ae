//! `ProtocolEngine`: the protocol dispatcher, generic over one device's
//! [`ReachCallbacks`] implementation.
//!
//! Owns every service and the single continuation slot; `process(tick)` is
//! the only entry point a device's main loop calls.

use prost::Message as _;

use crate::access::AccessGate;
use crate::buffers::Buffers;
use crate::callbacks::{
    AccessCallbacks, DeviceInfoCallbacks, ParameterCallbacks, ReachCallbacks, ServiceId,
    TransportCallbacks,
};
use crate::codec::proto::{
    self, CliNotification, DeviceInfoRequest, DiscoverNotificationsResponse, EraseFileRequest,
    ErrorCode, FileTransferDataNotification, FileTransferDataRequest, FileTransferInitRequest,
    Header, MessageType, ParamExInfoResponse, ParameterDisableNotifyRequest,
    ParameterEnableNotifyRequest, ParameterInfoRequest, ParameterNotification,
    ParameterNotifyConfigResult, ParameterReadRequest, ParameterWriteRequest,
    ParameterWriteResult, PingRequest, PingResponse, SendCommandRequest, SendCommandResponse,
    SetTimeRequest, Sizes, TransferDirection, WifiConnectRequest,
};
use crate::codec::sanitize::sanitize_utf8;
use crate::codec::wire::{decode_envelope, encode_envelope, EnvelopeForm};
use crate::config::{
    ReachConfig, CR_CODED_BUFFER_SIZE, REACH_BYTES_IN_A_FILE_PACKET, REACH_COUNT_PARAMS_IN_REQUEST,
    REACH_COUNT_PARAM_DESC_IN_RESPONSE, REACH_COUNT_PARAM_EX_LABELS, REACH_COUNT_PARAM_READ_VALUES,
    REACH_PVAL_BYTES_LEN, REACH_PVAL_STRING_LEN,
};
use crate::engine::continuation::{Continuation, ContinuationKind};
use crate::error::ReachError;
use crate::logging::MaskedLog;
use crate::report::build_report;
use crate::services::cli::CliService;
use crate::services::command::CommandService;
use crate::services::file_transfer::FileTransferService;
use crate::services::parameter::ParameterService;
use crate::services::stream::StreamService;
use crate::services::time::TimeService;
use crate::services::wifi::WifiService;

/// How many objects a files/commands/wifi scan list packs per response.
/// Parameter messages fix their chunk size as
/// `REACH_COUNT_PARAM_DESC_IN_RESPONSE`; these three lists are smaller,
/// fixed-shape structs so a slightly larger chunk still fits comfortably
/// under `CR_CODED_BUFFER_SIZE`.
const FILE_DISCOVER_CHUNK: usize = 4;
const COMMAND_DISCOVER_CHUNK: usize = 4;
const WIFI_DISCOVER_CHUNK: usize = 4;

/// The header fields of the prompt currently being answered.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    pub transaction_id: u32,
    pub endpoint_id: u32,
    pub client_id: u32,
}

enum DispatchOutcome {
    Response(MessageType, Vec<u8>),
    NoResponse,
    Err(ReachError, String),
}

/// Clients older than major version 1 of the semver triple (`"MAJOR.MINOR.PATCH"`,
/// §6.1) predate the ACK-rate override negotiation and need the plain
/// pre-negotiation fallback rate instead. A version that fails to parse is
/// treated the same way: a client that didn't declare a version can't be
/// assumed to understand the newer negotiation either.
fn is_legacy_client_version(version: &str) -> bool {
    version
        .split('.')
        .next()
        .and_then(|major| major.parse::<u32>().ok())
        .is_none_or(|major| major < 1)
}

/// The device-agnostic protocol runtime. Construct once with a device's
/// [`ReachCallbacks`] implementation and a [`ReachConfig`], then call
/// [`ProtocolEngine::process`] from the application's main loop.
pub struct ProtocolEngine<C: ReachCallbacks> {
    callbacks: C,
    config: ReachConfig,
    log: MaskedLog,
    buffers: Buffers,
    continuation: Continuation,
    parameter: ParameterService,
    file_transfer: FileTransferService,
    command: CommandService,
    cli: CliService,
    wifi: WifiService,
    stream: StreamService,
    now_ms: u32,
    last_tick_ms: u32,
    last_form: EnvelopeForm,
    was_connected: bool,
    context: RequestContext,
}

impl<C: ReachCallbacks> ProtocolEngine<C> {
    pub fn new(callbacks: C, config: ReachConfig) -> Self {
        let log = MaskedLog::new(config.default_log_mask);
        let cli = CliService::new(config.remote_cli_echo_on_default);
        Self {
            callbacks,
            config,
            log,
            buffers: Buffers::new(),
            continuation: Continuation::new(),
            parameter: ParameterService::new(),
            file_transfer: FileTransferService::new(),
            command: CommandService::new(),
            cli,
            wifi: WifiService::new(),
            stream: StreamService::new(),
            now_ms: 0,
            last_tick_ms: 0,
            last_form: EnvelopeForm::Ahsoka,
            was_connected: false,
            context: RequestContext::default(),
        }
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    /// Queue a line of CLI output produced outside of a direct
    /// request/response cycle, for asynchronous emission as a
    /// `CLI_NOTIFICATION` the next time there is no prompt to answer.
    pub fn emit_cli_line(&mut self, line: impl Into<String>) {
        self.cli.push_output(line);
    }

    /// Drive one tick of the dispatcher: connection-state transitions, the
    /// watchdog check, continuation resumption, prompt dispatch, and the
    /// notify scan when there is no prompt to answer.
    pub fn process(&mut self, now_ms: u32) {
        let delta_ms = now_ms.wrapping_sub(self.last_tick_ms);
        self.last_tick_ms = now_ms;
        self.now_ms = now_ms;

        let connected = self.callbacks.is_connected();
        if connected != self.was_connected {
            self.callbacks.invalidate_challenge_key();
            if !connected {
                self.reset_on_disconnect();
            }
            self.was_connected = connected;
        }
        if !connected {
            return;
        }

        if let Some(notif) = self.file_transfer.check_watchdog(now_ms) {
            self.log.log(
                log::Level::Error,
                format_args!(
                    "file transfer {} timed out at offset {}",
                    notif.transfer_id, notif.bytes_transferred
                ),
            );
        }

        self.buffers.encoded_response.clear();

        if self.continuation.is_active() {
            self.resume_continuation();
            return;
        }

        let len = self.callbacks.get_coded_prompt(self.buffers.encoded_message.as_mut());
        let Some(len) = len else {
            self.run_notify_scan(now_ms, delta_ms);
            return;
        };
        self.buffers.encoded_message.set_len(len);
        let frame = self.buffers.encoded_message.as_slice().to_vec();

        self.handle_prompt(&frame);
    }

    fn reset_on_disconnect(&mut self) {
        self.continuation.clear();
        self.parameter.reset_on_disconnect();
        self.file_transfer.reset_on_disconnect();
        self.command.reset_on_disconnect();
        self.cli.reset_on_disconnect();
        self.wifi.reset_on_disconnect();
        self.stream.reset_on_disconnect();
    }

    fn run_notify_scan(&mut self, now_ms: u32, delta_ms: u32) {
        let streaming_due = self.stream.tick(delta_ms);
        if streaming_due {
            self.log.log(log::Level::Debug, format_args!("stream cadence elapsed"));
        }

        if self.config.include_parameter_service {
            let due = self.parameter.scan(&self.callbacks, now_ms);
            for value in due {
                self.send_notification(
                    MessageType::ParameterNotification,
                    &ParameterNotification { value: Some(value) },
                );
            }
        }

        if self.config.include_cli_service {
            if let Some(line) = self.cli.take_next() {
                self.send_notification(MessageType::CliNotification, &line);
            }
        }
    }

    fn resume_continuation(&mut self) {
        let Some(kind) = self.continuation.active_kind() else {
            return;
        };
        match kind {
            ContinuationKind::ParameterDiscover => {
                let (resp, remaining) = self.parameter.discover(&mut self.callbacks, &[]);
                self.continuation.set_remaining(remaining);
                self.send_response(MessageType::DiscoverParameters, &resp.encode_to_vec());
            }
            ContinuationKind::ParameterDiscoverEx => {
                let (extensions, remaining) = self.parameter.discover_ex(&mut self.callbacks, &[]);
                self.continuation.set_remaining(remaining);
                let resp = ParamExInfoResponse { extensions, remaining_objects: remaining };
                self.send_response(MessageType::DiscoverParamEx, &resp.encode_to_vec());
            }
            ContinuationKind::ParameterRead => {
                let (resp, remaining) = self.parameter.read(&mut self.callbacks, &[]);
                self.continuation.set_remaining(remaining);
                self.send_response(MessageType::ReadParameters, &resp.encode_to_vec());
            }
            ContinuationKind::NotificationsDiscover => {
                let (slots, remaining) = self.parameter.discover_notifications();
                self.continuation.set_remaining(remaining);
                let resp = DiscoverNotificationsResponse { slots, remaining_objects: remaining };
                self.send_response(MessageType::DiscoverNotifications, &resp.encode_to_vec());
            }
            ContinuationKind::FileDiscover => {
                let resp = self.file_transfer.discover(&mut self.callbacks, FILE_DISCOVER_CHUNK);
                self.continuation.set_remaining(resp.remaining_objects);
                self.send_response(MessageType::DiscoverFiles, &resp.encode_to_vec());
            }
            ContinuationKind::CommandDiscover => {
                let resp = self.command.discover(&mut self.callbacks, COMMAND_DISCOVER_CHUNK);
                self.continuation.set_remaining(resp.remaining_objects);
                self.send_response(MessageType::DiscoverCommands, &resp.encode_to_vec());
            }
            ContinuationKind::WifiDiscover => {
                let resp = self.wifi.discover(&mut self.callbacks, WIFI_DISCOVER_CHUNK);
                self.continuation.set_remaining(resp.remaining_objects);
                self.send_response(MessageType::DiscoverWifi, &resp.encode_to_vec());
            }
            ContinuationKind::FileData => match self.file_transfer.next_read_chunk(&mut self.callbacks, self.now_ms) {
                Ok((chunk, bytes_remaining)) => {
                    let keep_going = bytes_remaining > 0 && !self.file_transfer.read_window_exhausted();
                    self.continuation.set_remaining(if keep_going { bytes_remaining } else { 0 });
                    self.send_response(MessageType::TransferData, &chunk.encode_to_vec());
                }
                Err(err) => {
                    self.continuation.clear();
                    self.file_transfer.abort();
                    self.respond_error(MessageType::TransferData, err, "read-direction transfer");
                }
            },
        }
    }

    fn handle_prompt(&mut self, frame: &[u8]) {
        let decoded = match decode_envelope(frame) {
            Ok(d) => d,
            Err(err) => {
                // No header was recovered, so there is nothing to address a
                // response to; this is the one failure the dispatcher only
                // logs rather than reports over the wire.
                self.log.log(log::Level::Error, format_args!("envelope decode failed: {err}"));
                return;
            }
        };
        self.last_form = decoded.form;
        self.context = RequestContext {
            transaction_id: decoded.header.transaction_id,
            endpoint_id: decoded.header.endpoint_id,
            client_id: decoded.header.client_id,
        };

        let message_type = MessageType::try_from(decoded.header.message_type)
            .unwrap_or(MessageType::MessageTypeInvalid);

        if let Err(err) = AccessGate::check_service(&self.callbacks, message_type) {
            self.respond_error(message_type, err, "service access denied");
            return;
        }

        match self.dispatch(message_type, &decoded.payload) {
            DispatchOutcome::Response(resp_type, bytes) => self.send_response(resp_type, &bytes),
            DispatchOutcome::NoResponse => {}
            DispatchOutcome::Err(err, detail) => self.respond_error(message_type, err, &detail),
        }
    }

    fn dispatch(&mut self, message_type: MessageType, payload: &[u8]) -> DispatchOutcome {
        match message_type {
            MessageType::Ping => self.handle_ping(payload),
            MessageType::GetDeviceInfo => self.handle_device_info(payload),
            MessageType::DiscoverParameters => self.handle_discover_parameters(payload),
            MessageType::DiscoverParamEx => self.handle_discover_param_ex(payload),
            MessageType::ReadParameters => self.handle_read_parameters(payload),
            MessageType::WriteParameters => self.handle_write_parameters(payload),
            MessageType::DiscoverNotifications => self.handle_discover_notifications(),
            MessageType::ParamEnableNotify => self.handle_enable_notify(payload),
            MessageType::ParamDisableNotify => self.handle_disable_notify(payload),
            MessageType::DiscoverFiles => self.handle_discover_files(),
            MessageType::TransferInit => self.handle_transfer_init(payload),
            MessageType::TransferData => self.handle_transfer_data(payload),
            MessageType::TransferDataNotification => self.handle_transfer_data_notification(payload),
            MessageType::EraseFile => self.handle_erase_file(payload),
            MessageType::DiscoverCommands => self.handle_discover_commands(),
            MessageType::SendCommand => self.handle_send_command(payload),
            MessageType::CliNotification => self.handle_cli_notification(payload),
            MessageType::GetTime => self.handle_get_time(),
            MessageType::SetTime => self.handle_set_time(payload),
            MessageType::DiscoverWifi => self.handle_discover_wifi(),
            MessageType::WifiConnect => self.handle_wifi_connect(payload),
            MessageType::ParameterNotification
            | MessageType::ErrorReport
            | MessageType::MessageTypeInvalid => {
                DispatchOutcome::Err(ReachError::NoService, format!("unsolicited {message_type:?}"))
            }
        }
    }

    fn handle_ping(&mut self, payload: &[u8]) -> DispatchOutcome {
        let req: PingRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode Ping".to_string()),
        };
        let resp = PingResponse {
            echo_data: req.echo_data,
            signal_strength: self.callbacks.ping_get_signal_strength(),
        };
        DispatchOutcome::Response(MessageType::Ping, resp.encode_to_vec())
    }

    fn handle_device_info(&mut self, payload: &[u8]) -> DispatchOutcome {
        let req: DeviceInfoRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode GetDeviceInfo".to_string()),
        };
        // §4.2/§6.1: record the client's declared protocol version so the
        // file-transfer service can fall back to the pre-negotiation ACK
        // rate heuristic for clients too old to understand rate override.
        self.file_transfer
            .set_legacy_ack_fallback(is_legacy_client_version(&req.client_protocol_version));
        let mut resp = self.callbacks.device_get_info(&req);
        resp.sizes = Some(self.sizes());
        resp.service_param = self.config.include_parameter_service;
        resp.service_file = self.config.include_file_service;
        resp.service_command = self.config.include_command_service;
        resp.service_cli = self.config.include_cli_service;
        resp.service_time = self.config.include_time_service;
        resp.service_stream = self.config.include_stream_service;
        resp.service_wifi = self.config.include_wifi_service;
        resp.challenge_required = self.config.app_required_challenge_key.is_some();
        resp.parameter_hash = if self.config.include_parameter_service {
            self.callbacks.compute_parameter_hash()
        } else {
            0
        };
        DispatchOutcome::Response(MessageType::GetDeviceInfo, resp.encode_to_vec())
    }

    fn sizes(&self) -> Sizes {
        Sizes {
            max_message_size: CR_CODED_BUFFER_SIZE as u32,
            big_data_buffer_size: REACH_BYTES_IN_A_FILE_PACKET as u32,
            parameter_buffer_count: REACH_COUNT_PARAM_READ_VALUES as u32,
            num_medium_structs_in_msg: REACH_COUNT_PARAM_DESC_IN_RESPONSE as u32,
            device_info_len: CR_CODED_BUFFER_SIZE as u32,
            long_string_len: REACH_PVAL_STRING_LEN as u32,
            count_param_ids: REACH_COUNT_PARAMS_IN_REQUEST as u32,
            medium_string_len: REACH_PVAL_STRING_LEN as u32,
            short_string_len: REACH_PVAL_BYTES_LEN as u32,
            param_info_enum_count: REACH_COUNT_PARAM_EX_LABELS as u32,
            services_count: 7,
            pi_enum_count: REACH_COUNT_PARAM_EX_LABELS as u32,
            num_commands_in_response: REACH_COUNT_PARAM_DESC_IN_RESPONSE as u32,
            count_param_desc_in_response: REACH_COUNT_PARAM_DESC_IN_RESPONSE as u32,
        }
    }

    fn handle_discover_parameters(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_parameter_service {
            return DispatchOutcome::Err(ReachError::NoService, "parameter service not compiled in".to_string());
        }
        let req: ParameterInfoRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode DiscoverParameters".to_string()),
        };
        let (resp, remaining) = self.parameter.discover(&mut self.callbacks, &req.parameter_ids);
        if remaining > 0 {
            self.continuation.start(ContinuationKind::ParameterDiscover, remaining);
        }
        DispatchOutcome::Response(MessageType::DiscoverParameters, resp.encode_to_vec())
    }

    fn handle_discover_param_ex(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_parameter_service {
            return DispatchOutcome::Err(ReachError::NoService, "parameter service not compiled in".to_string());
        }
        let req: ParameterInfoRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode DiscoverParamEx".to_string()),
        };
        let (extensions, remaining) = self.parameter.discover_ex(&mut self.callbacks, &req.parameter_ids);
        if remaining > 0 {
            self.continuation.start(ContinuationKind::ParameterDiscoverEx, remaining);
        }
        let resp = ParamExInfoResponse { extensions, remaining_objects: remaining };
        DispatchOutcome::Response(MessageType::DiscoverParamEx, resp.encode_to_vec())
    }

    fn handle_read_parameters(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_parameter_service {
            return DispatchOutcome::Err(ReachError::NoService, "parameter service not compiled in".to_string());
        }
        let req: ParameterReadRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode ReadParameters".to_string()),
        };
        let (resp, remaining) = self.parameter.read(&mut self.callbacks, &req.parameter_ids);
        if remaining > 0 {
            self.continuation.start(ContinuationKind::ParameterRead, remaining);
        }
        DispatchOutcome::Response(MessageType::ReadParameters, resp.encode_to_vec())
    }

    /// Applied value by value (not delegated to [`ParameterService::write`])
    /// so the response can name the specific id that failed, per
    /// `ParameterWriteResult::failed_parameter_id`.
    fn handle_write_parameters(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_parameter_service {
            return DispatchOutcome::Err(ReachError::NoService, "parameter service not compiled in".to_string());
        }
        let req: ParameterWriteRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode WriteParameters".to_string()),
        };
        for value in &req.values {
            if let Err(err) = AccessGate::check_object(&self.callbacks, ServiceId::Parameter, value.parameter_id) {
                let resp = ParameterWriteResult { result: err.code() as i32, failed_parameter_id: value.parameter_id };
                return DispatchOutcome::Response(MessageType::WriteParameters, resp.encode_to_vec());
            }
            if let Err(err) = self.callbacks.parameter_write(value) {
                let resp = ParameterWriteResult { result: err.code() as i32, failed_parameter_id: value.parameter_id };
                return DispatchOutcome::Response(MessageType::WriteParameters, resp.encode_to_vec());
            }
        }
        let resp = ParameterWriteResult { result: ErrorCode::NoError as i32, failed_parameter_id: 0 };
        DispatchOutcome::Response(MessageType::WriteParameters, resp.encode_to_vec())
    }

    fn handle_discover_notifications(&mut self) -> DispatchOutcome {
        if !self.config.include_parameter_service {
            return DispatchOutcome::Err(ReachError::NoService, "parameter service not compiled in".to_string());
        }
        let (slots, remaining) = self.parameter.discover_notifications();
        if remaining > 0 {
            self.continuation.start(ContinuationKind::NotificationsDiscover, remaining);
        }
        let resp = DiscoverNotificationsResponse { slots, remaining_objects: remaining };
        DispatchOutcome::Response(MessageType::DiscoverNotifications, resp.encode_to_vec())
    }

    fn handle_enable_notify(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_parameter_service {
            return DispatchOutcome::Err(ReachError::NoService, "parameter service not compiled in".to_string());
        }
        let req: ParameterEnableNotifyRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode ParamEnableNotify".to_string()),
        };
        if let Err(err) = AccessGate::check_object(&self.callbacks, ServiceId::Parameter, req.parameter_id) {
            let resp = ParameterNotifyConfigResult { result: err.code() as i32, parameter_id: req.parameter_id };
            return DispatchOutcome::Response(MessageType::ParamEnableNotify, resp.encode_to_vec());
        }
        let result = match self.parameter.enable_notify(
            &self.callbacks,
            self.now_ms,
            req.parameter_id,
            req.min_period_ms,
            req.max_period_ms,
            req.min_delta,
        ) {
            Ok(()) => ErrorCode::NoError,
            Err(err) => err.code(),
        };
        let resp = ParameterNotifyConfigResult { result: result as i32, parameter_id: req.parameter_id };
        DispatchOutcome::Response(MessageType::ParamEnableNotify, resp.encode_to_vec())
    }

    fn handle_disable_notify(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_parameter_service {
            return DispatchOutcome::Err(ReachError::NoService, "parameter service not compiled in".to_string());
        }
        let req: ParameterDisableNotifyRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode ParamDisableNotify".to_string()),
        };
        self.parameter.disable_notify(req.parameter_id);
        let resp = ParameterNotifyConfigResult { result: ErrorCode::NoError as i32, parameter_id: req.parameter_id };
        DispatchOutcome::Response(MessageType::ParamDisableNotify, resp.encode_to_vec())
    }

    fn handle_discover_files(&mut self) -> DispatchOutcome {
        if !self.config.include_file_service {
            return DispatchOutcome::Err(ReachError::NoService, "file service not compiled in".to_string());
        }
        let resp = self.file_transfer.discover(&mut self.callbacks, FILE_DISCOVER_CHUNK);
        if resp.remaining_objects > 0 {
            self.continuation.start(ContinuationKind::FileDiscover, resp.remaining_objects);
        }
        DispatchOutcome::Response(MessageType::DiscoverFiles, resp.encode_to_vec())
    }

    fn handle_transfer_init(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_file_service {
            return DispatchOutcome::Err(ReachError::NoService, "file service not compiled in".to_string());
        }
        let req: FileTransferInitRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode TransferInit".to_string()),
        };
        if let Err(err) = AccessGate::check_object(&self.callbacks, ServiceId::File, req.file_id) {
            return DispatchOutcome::Err(err, format!("file {} access denied", req.file_id));
        }
        let resp = self.file_transfer.open(&mut self.callbacks, &req, self.now_ms);
        if resp.result == ErrorCode::NoError as i32 && req.direction == TransferDirection::TransferRead as i32 {
            self.continuation.start(ContinuationKind::FileData, 1);
        }
        DispatchOutcome::Response(MessageType::TransferInit, resp.encode_to_vec())
    }

    fn handle_transfer_data(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_file_service {
            return DispatchOutcome::Err(ReachError::NoService, "file service not compiled in".to_string());
        }
        let req: FileTransferDataRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode TransferData".to_string()),
        };
        match self.file_transfer.write_data(&mut self.callbacks, &req, self.now_ms) {
            Some(notif) => DispatchOutcome::Response(MessageType::TransferDataNotification, notif.encode_to_vec()),
            None => DispatchOutcome::NoResponse,
        }
    }

    /// The client's ACK on a read-direction transfer. A completion ack gets
    /// an echoed reply; a mid-transfer ack just reopens the window and lets
    /// the continuation resume pushing `TRANSFER_DATA` on the next ticks.
    fn handle_transfer_data_notification(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_file_service {
            return DispatchOutcome::Err(ReachError::NoService, "file service not compiled in".to_string());
        }
        let req: FileTransferDataNotification = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode TransferDataNotification".to_string()),
        };
        match self.file_transfer.on_read_ack(req.is_complete, self.now_ms) {
            Some(notif) => {
                self.continuation.clear();
                DispatchOutcome::Response(MessageType::TransferDataNotification, notif.encode_to_vec())
            }
            None => {
                if self.file_transfer.read_in_progress() {
                    self.continuation.start(ContinuationKind::FileData, 1);
                }
                DispatchOutcome::NoResponse
            }
        }
    }

    fn handle_erase_file(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_file_service {
            return DispatchOutcome::Err(ReachError::NoService, "file service not compiled in".to_string());
        }
        let req: EraseFileRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode EraseFile".to_string()),
        };
        if let Err(err) = AccessGate::check_object(&self.callbacks, ServiceId::File, req.file_id) {
            return DispatchOutcome::Err(err, format!("file {} access denied", req.file_id));
        }
        let resp = self.file_transfer.erase(&mut self.callbacks, req.file_id);
        DispatchOutcome::Response(MessageType::EraseFile, resp.encode_to_vec())
    }

    fn handle_discover_commands(&mut self) -> DispatchOutcome {
        if !self.config.include_command_service {
            return DispatchOutcome::Err(ReachError::NoService, "command service not compiled in".to_string());
        }
        let resp = self.command.discover(&mut self.callbacks, COMMAND_DISCOVER_CHUNK);
        if resp.remaining_objects > 0 {
            self.continuation.start(ContinuationKind::CommandDiscover, resp.remaining_objects);
        }
        DispatchOutcome::Response(MessageType::DiscoverCommands, resp.encode_to_vec())
    }

    fn handle_send_command(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_command_service {
            return DispatchOutcome::Err(ReachError::NoService, "command service not compiled in".to_string());
        }
        let req: SendCommandRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode SendCommand".to_string()),
        };
        if let Err(err) = AccessGate::check_object(&self.callbacks, ServiceId::Command, req.command_id) {
            let resp = SendCommandResponse { result: err.code() as i32 };
            return DispatchOutcome::Response(MessageType::SendCommand, resp.encode_to_vec());
        }
        let resp = self.command.execute(&mut self.callbacks, req.command_id);
        DispatchOutcome::Response(MessageType::SendCommand, resp.encode_to_vec())
    }

    fn handle_cli_notification(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_cli_service {
            return DispatchOutcome::Err(ReachError::NoService, "cli service not compiled in".to_string());
        }
        let req: CliNotification = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode CliNotification".to_string()),
        };
        let line = sanitize_utf8(req.line.as_bytes(), REACH_BYTES_IN_A_FILE_PACKET);
        self.cli.handle_line(&mut self.callbacks, &line);
        DispatchOutcome::NoResponse
    }

    fn handle_get_time(&mut self) -> DispatchOutcome {
        if !self.config.include_time_service {
            return DispatchOutcome::Err(ReachError::NoService, "time service not compiled in".to_string());
        }
        let resp = TimeService::get(&self.callbacks);
        DispatchOutcome::Response(MessageType::GetTime, resp.encode_to_vec())
    }

    fn handle_set_time(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_time_service {
            return DispatchOutcome::Err(ReachError::NoService, "time service not compiled in".to_string());
        }
        let req: SetTimeRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode SetTime".to_string()),
        };
        let resp = TimeService::set(&mut self.callbacks, req.utc_seconds);
        DispatchOutcome::Response(MessageType::SetTime, resp.encode_to_vec())
    }

    fn handle_discover_wifi(&mut self) -> DispatchOutcome {
        if !self.config.include_wifi_service {
            return DispatchOutcome::Err(ReachError::NoService, "wifi service not compiled in".to_string());
        }
        let resp = self.wifi.discover(&mut self.callbacks, WIFI_DISCOVER_CHUNK);
        if resp.remaining_objects > 0 {
            self.continuation.start(ContinuationKind::WifiDiscover, resp.remaining_objects);
        }
        DispatchOutcome::Response(MessageType::DiscoverWifi, resp.encode_to_vec())
    }

    fn handle_wifi_connect(&mut self, payload: &[u8]) -> DispatchOutcome {
        if !self.config.include_wifi_service {
            return DispatchOutcome::Err(ReachError::NoService, "wifi service not compiled in".to_string());
        }
        let req: WifiConnectRequest = match proto::decode(payload) {
            Ok(r) => r,
            Err(err) => return DispatchOutcome::Err(err, "decode WifiConnect".to_string()),
        };
        let resp = WifiService::connect(&mut self.callbacks, &req.ssid, &req.passphrase);
        DispatchOutcome::Response(MessageType::WifiConnect, resp.encode_to_vec())
    }

    fn respond_error(&mut self, message_type: MessageType, err: ReachError, detail: &str) {
        let context = format!("{message_type:?}: {detail}");
        if let Some(report) = build_report(&self.log, self.config.error_report_format, err, &context) {
            self.send_response(MessageType::ErrorReport, &report.encode_to_vec());
        }
    }

    fn send_response(&mut self, message_type: MessageType, payload: &[u8]) {
        let header = Header {
            message_type: message_type as i32,
            endpoint_id: self.context.endpoint_id,
            client_id: self.context.client_id,
            transaction_id: self.context.transaction_id,
            remaining_objects: self.continuation.remaining(),
            is_message_compressed: false,
        };
        self.frame_and_send(&header, payload);
    }

    /// Stage an asynchronous, out-of-band message (parameter change, error
    /// report, CLI echo) through the dedicated notification buffer pair so
    /// it never aliases the request/response buffer mid-encode (§5).
    fn send_notification(&mut self, message_type: MessageType, payload_msg: &impl prost::Message) {
        let header = Header {
            message_type: message_type as i32,
            endpoint_id: self.context.endpoint_id,
            client_id: self.context.client_id,
            transaction_id: 0,
            remaining_objects: 0,
            is_message_compressed: false,
        };
        let payload = payload_msg.encode_to_vec();
        if let Err(err) = self.buffers.raw_notification.set(&payload) {
            self.log.log(log::Level::Error, format_args!("notification payload too large: {err}"));
            return;
        }

        let form = self.last_form;
        let result = {
            let raw = self.buffers.raw_notification.as_slice();
            let coded = self.buffers.coded_notification.as_mut();
            encode_envelope(&header, raw, form, &mut coded[..])
        };
        match result {
            Ok(n) => {
                self.buffers.coded_notification.set_len(n);
                let bytes = self.buffers.coded_notification.as_slice().to_vec();
                if let Err(err) = self.callbacks.send_coded_response(&bytes) {
                    self.log.log(log::Level::Error, format_args!("transport send failed: {err}"));
                }
            }
            Err(err) => {
                self.log.log(log::Level::Error, format_args!("notification encode failed: {err}"));
            }
        }
    }

    /// Stage a prompt-driven response through the request/response buffer
    /// (`encoded_response`), kept distinct from the notification pair above.
    fn frame_and_send(&mut self, header: &Header, payload: &[u8]) {
        let form = self.last_form;
        let result = {
            let buf = self.buffers.encoded_response.as_mut();
            encode_envelope(header, payload, form, &mut buf[..])
        };
        match result {
            Ok(n) => {
                self.buffers.encoded_response.set_len(n);
                let bytes = self.buffers.encoded_response.as_slice().to_vec();
                if let Err(err) = self.callbacks.send_coded_response(&bytes) {
                    self.log.log(log::Level::Error, format_args!("transport send failed: {err}"));
                }
            }
            Err(err) => {
                self.log.log(log::Level::Error, format_args!("response encode failed: {err}"));
            }
        }
    }
}
