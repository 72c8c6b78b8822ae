//! Reach demo — an in-process device and client driving one
//! `ProtocolEngine` tick loop over a pair of in-memory queues.
//!
//! There is no BLE or socket here: `reach` is transport-agnostic, so this
//! binary plays both ends itself to show the wire round trip. A real
//! device wires `TransportCallbacks` to its GATT/serial/socket stack
//! instead of the `VecDeque`s below.

use std::collections::VecDeque;

use prost::Message as _;

use reach::callbacks::{
    AccessCallbacks, CliCallbacks, CommandCallbacks, DeviceInfoCallbacks, FileCallbacks,
    ParameterCallbacks, TimeCallbacks, TransportCallbacks, WifiCallbacks,
};
use reach::codec::proto::{
    self, DeviceInfoRequest, DeviceInfoResponse, Header, MessageType, ParameterDataType,
    ParameterInfo, ParameterValue, PingRequest, Sizes,
};
use reach::codec::wire::{encode_envelope, EnvelopeForm};
use reach::config::ReachConfig;
use reach::error::{ReachError, Result};
use reach::ProtocolEngine;

/// A single in-memory parameter so `DISCOVER_PARAMETERS`/`READ_PARAMETERS`
/// have something to report.
struct Demo {
    inbox: VecDeque<Vec<u8>>,
    outbox: VecDeque<Vec<u8>>,
    connected: bool,
    brightness: u32,
    discover_done: bool,
}

impl Demo {
    fn new() -> Self {
        Self {
            inbox: VecDeque::new(),
            outbox: VecDeque::new(),
            connected: true,
            brightness: 50,
            discover_done: true,
        }
    }

    fn push_request(&mut self, message_type: MessageType, payload: &[u8]) {
        let header = Header {
            message_type: message_type as i32,
            endpoint_id: 0,
            client_id: 1,
            transaction_id: 0,
            remaining_objects: 0,
            is_message_compressed: false,
        };
        let mut buf = [0u8; reach::config::CR_CODED_BUFFER_SIZE];
        let n = encode_envelope(&header, payload, EnvelopeForm::Ahsoka, &mut buf)
            .expect("demo frame fits the coded buffer");
        self.inbox.push_back(buf[..n].to_vec());
    }
}

impl TransportCallbacks for Demo {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn get_coded_prompt(&mut self, buf: &mut [u8]) -> Option<usize> {
        let frame = self.inbox.pop_front()?;
        buf[..frame.len()].copy_from_slice(&frame);
        Some(frame.len())
    }

    fn send_coded_response(&mut self, buf: &[u8]) -> Result<()> {
        self.outbox.push_back(buf.to_vec());
        Ok(())
    }
}

impl AccessCallbacks for Demo {}

impl DeviceInfoCallbacks for Demo {
    fn device_get_info(&self, _request: &DeviceInfoRequest) -> DeviceInfoResponse {
        DeviceInfoResponse {
            device_name: "reach-demo".into(),
            manufacturer_name: "Reach Protocol Engineering".into(),
            device_description: "in-memory demo device".into(),
            firmware_version: "0.1.0".into(),
            protocol_version: "1.0.0".into(),
            sizes: Some(Sizes {
                max_message_size: reach::config::CR_CODED_BUFFER_SIZE as u32,
                big_data_buffer_size: reach::config::REACH_BYTES_IN_A_FILE_PACKET as u32,
                parameter_buffer_count: reach::config::REACH_COUNT_PARAMS_IN_REQUEST as u32,
                num_medium_structs_in_msg: reach::config::REACH_COUNT_PARAM_DESC_IN_RESPONSE as u32,
                device_info_len: 0,
                long_string_len: reach::config::REACH_PVAL_STRING_LEN as u32,
                count_param_ids: reach::config::REACH_COUNT_PARAMS_IN_REQUEST as u32,
                medium_string_len: reach::config::REACH_PVAL_STRING_LEN as u32,
                short_string_len: reach::config::REACH_PVAL_STRING_LEN as u32,
                param_info_enum_count: 0,
                services_count: 7,
                pi_enum_count: 0,
                num_commands_in_response: 0,
                count_param_desc_in_response: reach::config::REACH_COUNT_PARAM_DESC_IN_RESPONSE
                    as u32,
            }),
            service_param: true,
            service_file: true,
            service_command: true,
            service_cli: true,
            service_time: true,
            service_stream: true,
            service_wifi: true,
            challenge_required: false,
        }
    }
}

impl ParameterCallbacks for Demo {
    fn parameter_get_count(&self) -> u32 {
        1
    }

    fn discover_reset(&mut self, _filter: &[u32]) {
        self.discover_done = false;
    }

    fn discover_next(&mut self) -> Option<ParameterInfo> {
        if self.discover_done {
            return None;
        }
        self.discover_done = true;
        Some(ParameterInfo {
            id: 1,
            data_type: ParameterDataType::ParamUint32 as i32,
            size_in_bytes: 4,
            name: "brightness".into(),
            description: "LED brightness percent".into(),
            units: "%".into(),
            range_min: None,
            range_max: None,
            default_value: None,
            access: proto::ParameterAccess::AccessReadWrite as i32,
            storage_location: proto::StorageLocation::StorageRam as i32,
        })
    }

    fn parameter_read(&self, pid: u32) -> Result<ParameterValue> {
        if pid != 1 {
            return Err(ReachError::InvalidId);
        }
        Ok(ParameterValue {
            parameter_id: 1,
            value: Some(proto::parameter_value::Value::Uint32Value(self.brightness)),
        })
    }

    fn parameter_write(&mut self, value: &ParameterValue) -> Result<()> {
        if value.parameter_id != 1 {
            return Err(ReachError::InvalidId);
        }
        if let Some(proto::parameter_value::Value::Uint32Value(v)) = value.value {
            self.brightness = v;
            Ok(())
        } else {
            Err(ReachError::InvalidParameter)
        }
    }
}

impl FileCallbacks for Demo {}
impl CommandCallbacks for Demo {}
impl CliCallbacks for Demo {}
impl TimeCallbacks for Demo {}
impl WifiCallbacks for Demo {}

fn main() {
    env_logger::init();

    let device = Demo::new();
    let mut engine = ProtocolEngine::new(device, ReachConfig::default());

    engine.callbacks_mut().push_request(
        MessageType::Ping,
        &PingRequest {
            echo_data: vec![1, 2, 3],
        }
        .encode_to_vec(),
    );
    engine.callbacks_mut().push_request(
        MessageType::GetDeviceInfo,
        &DeviceInfoRequest {
            client_protocol_version: "1.0.0".into(),
            application_identifier: "reach-demo-client".into(),
        }
        .encode_to_vec(),
    );

    for tick in 0..4u32 {
        engine.process(tick * 10);
        while let Some(frame) = engine.callbacks_mut().outbox.pop_front() {
            log::info!("tick {tick}: device sent a {}-byte frame", frame.len());
        }
    }
}
