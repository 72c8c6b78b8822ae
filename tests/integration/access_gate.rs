//! The whole-service challenge gate and per-object authorization, each
//! exercised through the dispatcher so the response shape (an `ErrorReport`
//! versus a typed result carrying its own error code) matches what a real
//! client actually observes (see `src/access.rs` for the gate's own unit
//! tests in isolation).

use reach::codec::proto::{
    EraseFileRequest, ErrorCode, ErrorReport, FileAccess, FileInfo, MessageType,
    ParameterInfoRequest, ParameterValue, ParameterWriteRequest, ParameterWriteResult,
    parameter_value::Value,
};

use crate::mock_device::{self, MockDevice, MockParameter};

#[test]
fn an_invalid_challenge_blocks_every_service_but_device_info() {
    let mut device = MockDevice::new();
    device.challenge_valid = false;
    device.add_parameter(MockParameter {
        info: Default::default(),
        value: ParameterValue { parameter_id: 0, value: Some(Value::Float32Value(1.0)) },
        labels: Vec::new(),
    });
    let mut engine = mock_device::engine(device);

    let req = ParameterInfoRequest::default();
    engine.callbacks_mut().push_request(MessageType::DiscoverParameters, &req);
    engine.process(0);

    let decoded = engine.callbacks().decode_last().unwrap();
    assert_eq!(decoded.header.message_type, MessageType::ErrorReport as i32);
    let report: ErrorReport = reach::codec::proto::decode(&decoded.payload).unwrap();
    assert_eq!(report.result, ErrorCode::ChallengeFailed as i32);
}

#[test]
fn write_to_a_forbidden_parameter_is_reported_on_the_typed_result_not_an_error_report() {
    let mut device = MockDevice::new();
    device.access_granted = false;
    device.add_parameter(MockParameter {
        info: Default::default(),
        value: ParameterValue { parameter_id: 3, value: Some(Value::Float32Value(1.0)) },
        labels: Vec::new(),
    });
    let mut engine = mock_device::engine(device);

    let req = ParameterWriteRequest {
        values: vec![ParameterValue { parameter_id: 3, value: Some(Value::Float32Value(2.0)) }],
    };
    engine.callbacks_mut().push_request(MessageType::WriteParameters, &req);
    engine.process(0);

    let decoded = engine.callbacks().decode_last().unwrap();
    assert_eq!(decoded.header.message_type, MessageType::WriteParameters as i32);
    let resp: ParameterWriteResult = reach::codec::proto::decode(&decoded.payload).unwrap();
    assert_eq!(resp.result, ErrorCode::PermissionDenied as i32);
    assert_eq!(resp.failed_parameter_id, 3);
}

#[test]
fn erasing_a_forbidden_file_produces_an_error_report() {
    let mut device = MockDevice::new();
    device.access_granted = false;
    device.add_file(
        FileInfo { file_id: 1, access: FileAccess::FileAccessReadWrite as i32, ..Default::default() },
        Vec::new(),
    );
    let mut engine = mock_device::engine(device);

    let req = EraseFileRequest { file_id: 1 };
    engine.callbacks_mut().push_request(MessageType::EraseFile, &req);
    engine.process(0);

    let decoded = engine.callbacks().decode_last().unwrap();
    assert_eq!(decoded.header.message_type, MessageType::ErrorReport as i32);
    let report: ErrorReport = reach::codec::proto::decode(&decoded.payload).unwrap();
    assert_eq!(report.result, ErrorCode::PermissionDenied as i32);
}
