//! A full [`ReachCallbacks`] mock device shared by every integration test in
//! this directory, playing the role the pack's own `mock_hw.rs`-style test
//! doubles play for hardware ports: a plain in-memory stand-in for whatever
//! the real firmware would back each callback with.

use std::collections::HashMap;

use reach::callbacks::{
    AccessCallbacks, CliCallbacks, CommandCallbacks, DeviceInfoCallbacks, FileCallbacks,
    ParameterCallbacks, ServiceId, TimeCallbacks, TransportCallbacks, WifiCallbacks,
};
use reach::codec::proto::{
    self, CommandInfo, DeviceInfoRequest, DeviceInfoResponse, FileInfo, Header, MessageType,
    ParamExLabel, ParameterInfo, ParameterValue, WifiInfo,
};
use reach::codec::wire::{decode_envelope, encode_envelope, DecodedEnvelope, EnvelopeForm};
use reach::config::CR_CODED_BUFFER_SIZE;
use reach::error::{ReachError, Result};
use reach::ProtocolEngine;
use prost::Message as _;

#[derive(Clone)]
pub struct MockParameter {
    pub info: ParameterInfo,
    pub value: ParameterValue,
    pub labels: Vec<ParamExLabel>,
}

#[derive(Default)]
pub struct MockDevice {
    pub connected: bool,
    pub access_granted: bool,
    pub challenge_valid: bool,

    inbox: Vec<Vec<u8>>,
    pub outbox: Vec<Vec<u8>>,

    params: Vec<MockParameter>,
    discover_cursor: usize,
    ex_cursor: usize,
    ex_param_id: u32,

    files: HashMap<u32, Vec<u8>>,
    file_infos: HashMap<u32, FileInfo>,
    file_discover_cursor: usize,

    commands: Vec<CommandInfo>,
    command_cursor: usize,

    wifi_networks: Vec<WifiInfo>,
    wifi_cursor: usize,

    pub cli_log: Vec<String>,
    pub time_now: u64,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            connected: true,
            access_granted: true,
            challenge_valid: true,
            ..Default::default()
        }
    }

    pub fn add_parameter(&mut self, param: MockParameter) {
        self.params.push(param);
    }

    pub fn set_parameter_value(&mut self, id: u32, value: ParameterValue) {
        if let Some(p) = self.params.iter_mut().find(|p| p.info.id == id) {
            p.value = value;
        }
    }

    pub fn add_file(&mut self, info: FileInfo, bytes: Vec<u8>) {
        self.files.insert(info.file_id, bytes);
        self.file_infos.insert(info.file_id, info);
    }

    pub fn add_command(&mut self, id: u32, name: &str) {
        self.commands.push(CommandInfo { id, name: name.to_string() });
    }

    pub fn add_wifi(&mut self, info: WifiInfo) {
        self.wifi_networks.push(info);
    }

    /// Encode and enqueue one request frame, Ahsoka form (the form a client
    /// uses after the device-info handshake).
    pub fn push_request(&mut self, message_type: MessageType, payload: &impl prost::Message) {
        let header = Header {
            message_type: message_type as i32,
            endpoint_id: 0,
            client_id: 1,
            transaction_id: 1,
            remaining_objects: 0,
            is_message_compressed: false,
        };
        let mut buf = [0u8; CR_CODED_BUFFER_SIZE];
        let n = encode_envelope(&header, &payload.encode_to_vec(), EnvelopeForm::Ahsoka, &mut buf)
            .expect("request fits the coded buffer");
        self.inbox.push(buf[..n].to_vec());
    }

    pub fn decode_last(&self) -> Option<DecodedEnvelope> {
        self.outbox.last().map(|frame| decode_envelope(frame).expect("valid frame"))
    }

    pub fn decode_all(&self) -> Vec<DecodedEnvelope> {
        self.outbox.iter().map(|frame| decode_envelope(frame).expect("valid frame")).collect()
    }

    pub fn file_bytes(&self, fid: u32) -> Option<&[u8]> {
        self.files.get(&fid).map(Vec::as_slice)
    }
}

impl TransportCallbacks for MockDevice {
    fn is_connected(&self) -> bool {
        self.connected
    }
    fn get_coded_prompt(&mut self, buf: &mut [u8]) -> Option<usize> {
        if self.inbox.is_empty() {
            return None;
        }
        let frame = self.inbox.remove(0);
        buf[..frame.len()].copy_from_slice(&frame);
        Some(frame.len())
    }
    fn send_coded_response(&mut self, buf: &[u8]) -> Result<()> {
        self.outbox.push(buf.to_vec());
        Ok(())
    }
}

impl AccessCallbacks for MockDevice {
    fn challenge_key_is_valid(&self) -> bool {
        self.challenge_valid
    }
    fn access_granted(&self, _service: ServiceId, _object_id: u32) -> bool {
        self.access_granted
    }
    fn invalidate_challenge_key(&mut self) {
        self.challenge_valid = false;
    }
}

impl DeviceInfoCallbacks for MockDevice {
    fn device_get_info(&self, _request: &DeviceInfoRequest) -> DeviceInfoResponse {
        DeviceInfoResponse {
            device_name: "mock-device".to_string(),
            manufacturer_name: "acme".to_string(),
            firmware_version: "1.0.0".to_string(),
            protocol_version: "1.0.0".to_string(),
            ..Default::default()
        }
    }
}

impl ParameterCallbacks for MockDevice {
    fn parameter_get_count(&self) -> u32 {
        self.params.len() as u32
    }
    fn discover_reset(&mut self, _filter: &[u32]) {
        self.discover_cursor = 0;
    }
    fn discover_next(&mut self) -> Option<ParameterInfo> {
        let info = self.params.get(self.discover_cursor).map(|p| p.info.clone());
        self.discover_cursor += 1;
        info
    }
    fn ex_get_count(&self, pid: u32) -> u32 {
        self.params.iter().find(|p| p.info.id == pid).map_or(0, |p| p.labels.len() as u32)
    }
    fn ex_discover_reset(&mut self, pid: u32) {
        self.ex_param_id = pid;
        self.ex_cursor = 0;
    }
    fn ex_discover_next(&mut self) -> Option<ParamExLabel> {
        let param = self.params.iter().find(|p| p.info.id == self.ex_param_id)?;
        let label = param.labels.get(self.ex_cursor).cloned();
        self.ex_cursor += 1;
        label
    }
    fn parameter_read(&self, pid: u32) -> Result<ParameterValue> {
        self.params.iter().find(|p| p.info.id == pid).map(|p| p.value.clone()).ok_or(ReachError::InvalidId)
    }
    fn parameter_write(&mut self, value: &ParameterValue) -> Result<()> {
        let Some(p) = self.params.iter_mut().find(|p| p.info.id == value.parameter_id) else {
            return Err(ReachError::InvalidId);
        };
        p.value = value.clone();
        Ok(())
    }
    fn compute_parameter_hash(&self) -> u32 {
        let mut acc: u32 = 0x811C_9DC5;
        for p in &self.params {
            for byte in p.info.encode_to_vec() {
                acc ^= u32::from(byte);
                acc = acc.wrapping_mul(0x0100_0193);
            }
        }
        acc
    }
}

impl FileCallbacks for MockDevice {
    fn file_get_file_count(&self) -> u32 {
        self.file_infos.len() as u32
    }
    fn file_discover_reset(&mut self, _fid_filter: Option<u32>) {
        self.file_discover_cursor = 0;
    }
    fn file_discover_next(&mut self) -> Option<FileInfo> {
        let mut ids: Vec<u32> = self.file_infos.keys().copied().collect();
        ids.sort_unstable();
        let info = ids.get(self.file_discover_cursor).and_then(|id| self.file_infos.get(id).cloned());
        self.file_discover_cursor += 1;
        info
    }
    fn file_get_description(&self, fid: u32) -> Option<FileInfo> {
        self.file_infos.get(&fid).cloned()
    }
    fn read_file(&mut self, fid: u32, offset: u32, buf: &mut [u8]) -> Result<usize> {
        let data = self.files.get(&fid).ok_or(ReachError::BadFile)?;
        let offset = offset as usize;
        let n = buf.len().min(data.len().saturating_sub(offset));
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }
    fn write_file(&mut self, fid: u32, offset: u32, data: &[u8]) -> Result<()> {
        let file = self.files.entry(fid).or_default();
        let offset = offset as usize;
        if file.len() < offset + data.len() {
            file.resize(offset + data.len(), 0);
        }
        file[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
    fn file_prepare_to_write(&mut self, fid: u32, _offset: u32, _length: u32) -> Result<()> {
        self.files.entry(fid).or_default();
        Ok(())
    }
    fn erase_file(&mut self, fid: u32) -> Result<()> {
        self.files.remove(&fid);
        Ok(())
    }
}

impl CommandCallbacks for MockDevice {
    fn get_command_count(&self) -> u32 {
        self.commands.len() as u32
    }
    fn command_discover_reset(&mut self) {
        self.command_cursor = 0;
    }
    fn command_discover_next(&mut self) -> Option<CommandInfo> {
        let info = self.commands.get(self.command_cursor).cloned();
        self.command_cursor += 1;
        info
    }
    fn command_execute(&mut self, cid: u32) -> Result<()> {
        if self.commands.iter().any(|c| c.id == cid) {
            Ok(())
        } else {
            Err(ReachError::InvalidId)
        }
    }
}

impl CliCallbacks for MockDevice {
    fn cli_enter(&mut self, line: &str) -> Result<()> {
        self.cli_log.push(line.to_string());
        Ok(())
    }
}

impl TimeCallbacks for MockDevice {
    fn time_get(&self) -> u64 {
        self.time_now
    }
    fn time_set(&mut self, utc_seconds: u64) -> Result<()> {
        self.time_now = utc_seconds;
        Ok(())
    }
}

impl WifiCallbacks for MockDevice {
    fn wifi_discover_reset(&mut self) {
        self.wifi_cursor = 0;
    }
    fn wifi_discover_next(&mut self) -> Option<WifiInfo> {
        let info = self.wifi_networks.get(self.wifi_cursor).cloned();
        self.wifi_cursor += 1;
        info
    }
    fn wifi_connection(&mut self, ssid: &str, _passphrase: &str) -> Result<()> {
        if self.wifi_networks.iter().any(|w| w.ssid == ssid) {
            Ok(())
        } else {
            Err(ReachError::InvalidParameter)
        }
    }
}

pub fn engine(device: MockDevice) -> ProtocolEngine<MockDevice> {
    ProtocolEngine::new(device, reach::ReachConfig::default())
}

/// Silence "never constructed" warnings for helpers only some test files use.
#[allow(dead_code)]
pub fn decode<M: prost::Message + Default>(bytes: &[u8]) -> M {
    proto::decode(bytes).expect("valid payload")
}
