//! WiFi provisioning service: scan discovery plus a connect request.

use crate::callbacks::WifiCallbacks;
use crate::codec::proto::{DiscoverWifiResponse, ErrorCode, WifiConnectResponse, WifiInfo};

struct PendingList {
    items: Vec<WifiInfo>,
    cursor: usize,
}

#[derive(Default)]
pub struct WifiService {
    pending: Option<PendingList>,
}

impl WifiService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discover<C: WifiCallbacks>(&mut self, callbacks: &mut C, chunk_size: usize) -> DiscoverWifiResponse {
        if self.pending.is_none() {
            callbacks.wifi_discover_reset();
            let mut items = Vec::new();
            while let Some(info) = callbacks.wifi_discover_next() {
                items.push(info);
            }
            self.pending = Some(PendingList { items, cursor: 0 });
        }
        let pending = self.pending.as_mut().expect("just set");
        let end = (pending.cursor + chunk_size).min(pending.items.len());
        let networks = pending.items[pending.cursor..end].to_vec();
        pending.cursor = end;
        let remaining = (pending.items.len() - pending.cursor) as u32;
        if remaining == 0 {
            self.pending = None;
        }
        DiscoverWifiResponse {
            networks,
            remaining_objects: remaining,
        }
    }

    pub fn connect<C: WifiCallbacks>(callbacks: &mut C, ssid: &str, passphrase: &str) -> WifiConnectResponse {
        let result = match callbacks.wifi_connection(ssid, passphrase) {
            Ok(()) => ErrorCode::NoError,
            Err(err) => err.code(),
        };
        WifiConnectResponse { result: result as i32 }
    }

    pub fn reset_on_disconnect(&mut self) {
        self.pending = None;
    }
}
