//! Black-box `ProtocolEngine` scenarios, each driving the engine through
//! its public API against a [`mock_device::MockDevice`] the way a real
//! transport would.

mod mock_device;

mod access_gate;
mod device_info_handshake;
mod parameter_flow;
