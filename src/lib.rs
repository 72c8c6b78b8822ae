//! `reach` — a transport-agnostic embedded RPC protocol stack.
//!
//! The crate owns the wire codec, the envelope framing, the access gate,
//! and the per-service dispatch logic. It never touches GPIO, BLE stacks,
//! or WiFi drivers directly: a host binds its own hardware behind the
//! callback traits in [`callbacks`] and drives the resulting
//! [`engine::ProtocolEngine`] from its own tick loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                    Host-provided callbacks                     │
//! │   TransportCallbacks · AccessCallbacks · DeviceInfoCallbacks    │
//! │   ParameterCallbacks · FileCallbacks · CommandCallbacks         │
//! │   CliCallbacks · TimeCallbacks · WifiCallbacks                 │
//! │  ──────────────────── Port trait boundary ───────────────────  │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │             ProtocolEngine::process(tick)                │  │
//! │  │  codec/wire → access → services::* → engine::continuation│  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

pub mod access;
pub mod buffers;
pub mod callbacks;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod report;
pub mod services;
pub mod watchdog;

pub use callbacks::ReachCallbacks;
pub use config::ReachConfig;
pub use engine::ProtocolEngine;
pub use error::{ReachError, Result};
