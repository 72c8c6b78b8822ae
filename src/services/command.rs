//! Command service: a flat, discoverable list of fire-and-forget actions
//! the client can invoke by id.

use crate::callbacks::CommandCallbacks;
use crate::codec::proto::{CommandInfo, DiscoverCommandsResponse, ErrorCode, SendCommandResponse};

struct PendingList {
    items: Vec<CommandInfo>,
    cursor: usize,
}

#[derive(Default)]
pub struct CommandService {
    pending: Option<PendingList>,
}

impl CommandService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discover<C: CommandCallbacks>(&mut self, callbacks: &mut C, chunk_size: usize) -> DiscoverCommandsResponse {
        if self.pending.is_none() {
            callbacks.command_discover_reset();
            let mut items = Vec::new();
            while let Some(info) = callbacks.command_discover_next() {
                items.push(info);
            }
            self.pending = Some(PendingList { items, cursor: 0 });
        }
        let pending = self.pending.as_mut().expect("just set");
        let end = (pending.cursor + chunk_size).min(pending.items.len());
        let commands = pending.items[pending.cursor..end].to_vec();
        pending.cursor = end;
        let remaining = (pending.items.len() - pending.cursor) as u32;
        if remaining == 0 {
            self.pending = None;
        }
        DiscoverCommandsResponse {
            commands,
            remaining_objects: remaining,
        }
    }

    pub fn execute<C: CommandCallbacks>(&self, callbacks: &mut C, command_id: u32) -> SendCommandResponse {
        let result = match callbacks.command_execute(command_id) {
            Ok(()) => ErrorCode::NoError,
            Err(err) => err.code(),
        };
        SendCommandResponse { result: result as i32 }
    }

    pub fn reset_on_disconnect(&mut self) {
        self.pending = None;
    }
}
