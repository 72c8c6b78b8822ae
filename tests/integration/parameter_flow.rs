//! Discovery pagination, read/write, and the notify-threshold scan, run
//! through the full dispatcher rather than against `ParameterService`
//! directly (see `src/services/parameter.rs` for the unit-level coverage of
//! the same pagination and threshold math).

use reach::codec::proto::{
    ErrorCode, MessageType, ParameterEnableNotifyRequest, ParameterInfo, ParameterInfoRequest,
    ParameterInfoResponse, ParameterNotification, ParameterNotifyConfigResult,
    ParameterReadRequest, ParameterReadResult, ParameterValue, ParameterWriteRequest,
    ParameterWriteResult, parameter_value::Value,
};

use crate::mock_device::{self, MockDevice, MockParameter};

fn device_with_parameters(count: u32) -> MockDevice {
    let mut device = MockDevice::new();
    for id in 0..count {
        device.add_parameter(MockParameter {
            info: ParameterInfo { id, name: format!("p{id}"), ..Default::default() },
            value: ParameterValue { parameter_id: id, value: Some(Value::Float32Value(10.0)) },
            labels: Vec::new(),
        });
    }
    device
}

#[test]
fn discover_parameters_paginates_across_ticks_with_no_new_prompt() {
    let mut engine = mock_device::engine(device_with_parameters(5));
    let req = ParameterInfoRequest::default();
    engine.callbacks_mut().push_request(MessageType::DiscoverParameters, &req);
    engine.process(0);

    let first: ParameterInfoResponse =
        reach::codec::proto::decode(&engine.callbacks().decode_last().unwrap().payload).unwrap();
    assert_eq!(first.parameters.len(), 2);
    assert_eq!(first.remaining_objects, 3);

    engine.process(1);
    let second: ParameterInfoResponse =
        reach::codec::proto::decode(&engine.callbacks().decode_last().unwrap().payload).unwrap();
    assert_eq!(second.parameters.len(), 2);
    assert_eq!(second.remaining_objects, 1);

    engine.process(2);
    let third: ParameterInfoResponse =
        reach::codec::proto::decode(&engine.callbacks().decode_last().unwrap().payload).unwrap();
    assert_eq!(third.parameters.len(), 1);
    assert_eq!(third.remaining_objects, 0);
}

#[test]
fn read_then_write_round_trips_a_value() {
    let mut engine = mock_device::engine(device_with_parameters(1));

    let write = ParameterWriteRequest {
        values: vec![ParameterValue { parameter_id: 0, value: Some(Value::Float32Value(42.0)) }],
    };
    engine.callbacks_mut().push_request(MessageType::WriteParameters, &write);
    engine.process(0);
    let write_resp: ParameterWriteResult =
        reach::codec::proto::decode(&engine.callbacks().decode_last().unwrap().payload).unwrap();
    assert_eq!(write_resp.result, ErrorCode::NoError as i32);

    let read = ParameterReadRequest { parameter_ids: vec![0] };
    engine.callbacks_mut().push_request(MessageType::ReadParameters, &read);
    engine.process(1);
    let read_resp: ParameterReadResult =
        reach::codec::proto::decode(&engine.callbacks().decode_last().unwrap().payload).unwrap();
    assert_eq!(read_resp.values[0].value, Some(Value::Float32Value(42.0)));
}

#[test]
fn write_to_an_unknown_parameter_names_the_failing_id() {
    let mut engine = mock_device::engine(device_with_parameters(1));
    let write = ParameterWriteRequest {
        values: vec![ParameterValue { parameter_id: 999, value: Some(Value::Float32Value(1.0)) }],
    };
    engine.callbacks_mut().push_request(MessageType::WriteParameters, &write);
    engine.process(0);
    let resp: ParameterWriteResult =
        reach::codec::proto::decode(&engine.callbacks().decode_last().unwrap().payload).unwrap();
    assert_eq!(resp.result, ErrorCode::InvalidId as i32);
    assert_eq!(resp.failed_parameter_id, 999);
}

#[test]
fn a_large_delta_past_threshold_fires_an_asynchronous_notification() {
    let mut engine = mock_device::engine(device_with_parameters(1));

    let enable = ParameterEnableNotifyRequest {
        parameter_id: 0,
        min_period_ms: 0,
        max_period_ms: 0,
        min_delta: 5.0,
    };
    engine.callbacks_mut().push_request(MessageType::ParamEnableNotify, &enable);
    engine.process(0);
    let ack: ParameterNotifyConfigResult =
        reach::codec::proto::decode(&engine.callbacks().decode_last().unwrap().payload).unwrap();
    assert_eq!(ack.result, ErrorCode::NoError as i32);

    engine.callbacks_mut().set_parameter_value(0, ParameterValue {
        parameter_id: 0,
        value: Some(Value::Float32Value(20.0)),
    });
    // No prompt queued: this tick runs the notify scan instead of a dispatch.
    engine.process(100);

    let decoded = engine.callbacks().decode_last().unwrap();
    assert_eq!(decoded.header.message_type, MessageType::ParameterNotification as i32);
    let notif: ParameterNotification = reach::codec::proto::decode(&decoded.payload).unwrap();
    assert_eq!(notif.value.unwrap().value, Some(Value::Float32Value(20.0)));
}

#[test]
fn a_small_delta_below_threshold_stays_silent() {
    let mut engine = mock_device::engine(device_with_parameters(1));
    let enable = ParameterEnableNotifyRequest {
        parameter_id: 0,
        min_period_ms: 0,
        max_period_ms: 0,
        min_delta: 5.0,
    };
    engine.callbacks_mut().push_request(MessageType::ParamEnableNotify, &enable);
    engine.process(0);
    let before = engine.callbacks().outbox.len();

    engine.callbacks_mut().set_parameter_value(0, ParameterValue {
        parameter_id: 0,
        value: Some(Value::Float32Value(11.0)),
    });
    engine.process(100);

    assert_eq!(engine.callbacks().outbox.len(), before);
}
