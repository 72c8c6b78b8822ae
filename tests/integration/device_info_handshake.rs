//! The opening exchange every client performs: an unauthenticated
//! `GET_DEVICE_INFO` followed by a `PING`, mirroring the handshake a BLE
//! central runs right after connecting.

use prost::Message as _;
use reach::codec::proto::{
    DeviceInfoRequest, DeviceInfoResponse, MessageType, ParameterInfo, ParameterValue, PingRequest,
    PingResponse, parameter_value::Value,
};

use crate::mock_device::{self, MockDevice, MockParameter};

#[test]
fn device_info_is_reachable_before_any_challenge_is_satisfied() {
    let mut device = MockDevice::new();
    device.challenge_valid = false;
    let mut engine = mock_device::engine(device);

    let req = DeviceInfoRequest {
        client_protocol_version: "1.0.0".to_string(),
        application_identifier: "test-client".to_string(),
    };
    engine.callbacks_mut().push_request(MessageType::GetDeviceInfo, &req);
    engine.process(0);

    let decoded = engine.callbacks().decode_last().expect("a response was sent");
    assert_eq!(decoded.header.message_type, MessageType::GetDeviceInfo as i32);
    let resp: DeviceInfoResponse = reach::codec::proto::decode(&decoded.payload).unwrap();
    assert_eq!(resp.device_name, "mock-device");
    assert!(resp.sizes.is_some());
    assert!(resp.service_param);
    assert!(resp.service_file);
}

#[test]
fn ping_echoes_the_exact_bytes_sent() {
    let device = MockDevice::new();
    let mut engine = mock_device::engine(device);

    let req = PingRequest { echo_data: vec![1, 2, 3, 4, 5] };
    engine.callbacks_mut().push_request(MessageType::Ping, &req);
    engine.process(0);

    let decoded = engine.callbacks().decode_last().unwrap();
    let resp: PingResponse = reach::codec::proto::decode(&decoded.payload).unwrap();
    assert_eq!(resp.echo_data, vec![1, 2, 3, 4, 5]);
}

#[test]
fn parameter_hash_changes_when_the_descriptor_table_changes() {
    let mut device = MockDevice::new();
    device.add_parameter(MockParameter {
        info: ParameterInfo { id: 1, name: "temp".to_string(), ..Default::default() },
        value: ParameterValue { parameter_id: 1, value: Some(Value::Float32Value(0.0)) },
        labels: Vec::new(),
    });
    let mut engine = mock_device::engine(device);

    let req = DeviceInfoRequest::default();
    engine.callbacks_mut().push_request(MessageType::GetDeviceInfo, &req);
    engine.process(0);
    let first: DeviceInfoResponse =
        reach::codec::proto::decode(&engine.callbacks().decode_last().unwrap().payload).unwrap();

    engine.callbacks_mut().add_parameter(MockParameter {
        info: ParameterInfo { id: 2, name: "humidity".to_string(), ..Default::default() },
        value: ParameterValue { parameter_id: 2, value: Some(Value::Float32Value(0.0)) },
        labels: Vec::new(),
    });
    engine.callbacks_mut().push_request(MessageType::GetDeviceInfo, &req);
    engine.process(1);
    let second: DeviceInfoResponse =
        reach::codec::proto::decode(&engine.callbacks().decode_last().unwrap().payload).unwrap();

    assert_ne!(first.parameter_hash, second.parameter_hash);
}
