//! File transfer service: windowed, ACK-paced bidirectional transfer with
//! an optional RFC 1071 checksum and a timeout watchdog.

use crate::callbacks::FileCallbacks;
use crate::checksum::internet_checksum;
use crate::codec::proto::{
    DiscoverFilesResponse, EraseFileResponse, ErrorCode, FileAccess, FileInfo,
    FileTransferDataNotification, FileTransferDataRequest, FileTransferInitRequest,
    FileTransferInitResponse, TransferDirection,
};
use crate::config::REACH_BYTES_IN_A_FILE_PACKET;
use crate::error::{ReachError, Result};
use crate::watchdog::Watchdog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferState {
    Invalid,
    Idle,
    Init,
    Data,
    Complete,
}

struct PendingList<T> {
    items: Vec<T>,
    cursor: usize,
}

impl<T: Clone> PendingList<T> {
    fn new(items: Vec<T>) -> Self {
        Self { items, cursor: 0 }
    }

    fn take(&mut self, n: usize) -> (Vec<T>, u32) {
        let end = (self.cursor + n).min(self.items.len());
        let chunk = self.items[self.cursor..end].to_vec();
        self.cursor = end;
        let remaining = (self.items.len() - self.cursor) as u32;
        (chunk, remaining)
    }
}

/// Per-transfer session state. Only one transfer is active at a time, the
/// way a single-threaded engine with one continuation slot implies.
struct Session {
    state: TransferState,
    file_id: u32,
    transfer_id: u32,
    direction: TransferDirection,
    use_checksum: bool,
    ack_rate: u32,
    start_offset: u32,
    next_offset: u32,
    next_message_number: u32,
    total_length: u32,
    ack_window_remaining: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: TransferState::Invalid,
            file_id: 0,
            transfer_id: 0,
            direction: TransferDirection::TransferRead,
            use_checksum: false,
            ack_rate: 1,
            start_offset: 0,
            next_offset: 0,
            next_message_number: 0,
            total_length: 0,
            ack_window_remaining: 0,
        }
    }
}

impl Session {
    fn bytes_transferred(&self) -> u32 {
        self.next_offset - self.start_offset
    }

    fn bytes_remaining(&self) -> u32 {
        self.total_length.saturating_sub(self.bytes_transferred())
    }
}

#[derive(Default)]
pub struct FileTransferService {
    session: Session,
    watchdog: Watchdog,
    pending_discover: Option<PendingList<FileInfo>>,
    legacy_ack_fallback: bool,
}

impl FileTransferService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whether the connected client's declared protocol version
    /// needs the pre-negotiation ACK-rate heuristic (§6.1: "older clients
    /// require a heuristic ACK-rate fallback"). Set from the client's
    /// `GET_DEVICE_INFO` handshake.
    pub fn set_legacy_ack_fallback(&mut self, legacy: bool) {
        self.legacy_ack_fallback = legacy;
    }

    pub fn discover<C: FileCallbacks>(&mut self, callbacks: &mut C, chunk_size: usize) -> DiscoverFilesResponse {
        if self.pending_discover.is_none() {
            callbacks.file_discover_reset(None);
            let mut items = Vec::new();
            while let Some(info) = callbacks.file_discover_next() {
                items.push(info);
            }
            self.pending_discover = Some(PendingList::new(items));
        }
        let pending = self.pending_discover.as_mut().expect("just set");
        let (chunk, remaining) = pending.take(chunk_size);
        if remaining == 0 {
            self.pending_discover = None;
        }
        DiscoverFilesResponse {
            files: chunk,
            remaining_objects: remaining,
        }
    }

    /// Negotiate an ACK rate and open a session: the requested rate is
    /// honored if the device accepts it verbatim, otherwise the device's
    /// preferred rate is substituted and returned to the client rather than
    /// rejecting the request outright.
    pub fn open<C: FileCallbacks>(
        &mut self,
        callbacks: &mut C,
        req: &FileTransferInitRequest,
        now_ms: u32,
    ) -> FileTransferInitResponse {
        // Invariant 4: at most one transfer is not Idle at a time. A new
        // TRANSFER_INIT implicitly aborts whatever was in flight.
        if matches!(self.session.state, TransferState::Init | TransferState::Data) {
            self.abort();
        }

        let Some(info) = callbacks.file_get_description(req.file_id) else {
            return FileTransferInitResponse {
                result: ErrorCode::BadFile as i32,
                transfer_id: req.transfer_id,
                ack_rate: 0,
                result_message: String::new(),
            };
        };

        let is_write = req.direction == TransferDirection::TransferWrite as i32;
        let access = FileAccess::try_from(info.access).unwrap_or(FileAccess::FileAccessNone);
        let permitted = if is_write {
            matches!(access, FileAccess::FileAccessWrite | FileAccess::FileAccessReadWrite)
        } else {
            matches!(access, FileAccess::FileAccessRead | FileAccess::FileAccessReadWrite)
        };
        if !permitted {
            return FileTransferInitResponse {
                result: ErrorCode::PermissionDenied as i32,
                transfer_id: req.transfer_id,
                ack_rate: 0,
                result_message: String::new(),
            };
        }

        if is_write {
            if let Err(err) = callbacks.file_prepare_to_write(req.file_id, req.request_offset, req.transfer_length) {
                return FileTransferInitResponse {
                    result: err.code() as i32,
                    transfer_id: req.transfer_id,
                    ack_rate: 0,
                    result_message: String::new(),
                };
            }
        }

        let preferred = callbacks.file_get_preferred_ack_rate(req.file_id, req.requested_ack_rate, is_write);
        let (ack_rate, result_message) = match (req.requested_ack_rate, preferred) {
            (0, 0) if self.legacy_ack_fallback => (1, String::new()),
            (0, 0) => (10, String::new()),
            (0, m) => (m, String::new()),
            (n, 0) => (n, String::new()),
            (n, m) if m == n => (n, String::new()),
            (n, m) => (
                m,
                format!("Requested ack rate {n} overridden to device preference {m}."),
            ),
        };
        let ack_rate = ack_rate.max(1);

        self.session = Session {
            state: TransferState::Init,
            file_id: req.file_id,
            transfer_id: req.transfer_id,
            direction: TransferDirection::try_from(req.direction).unwrap_or(TransferDirection::TransferRead),
            use_checksum: req.use_checksum,
            ack_rate,
            start_offset: req.request_offset,
            next_offset: req.request_offset,
            next_message_number: 0,
            total_length: if is_write {
                req.transfer_length
            } else {
                info.current_size_bytes.saturating_sub(req.request_offset)
            },
            ack_window_remaining: ack_rate,
        };
        self.session.state = TransferState::Data;
        self.watchdog.start(req.timeout_ms, now_ms);

        FileTransferInitResponse {
            result: ErrorCode::NoError as i32,
            transfer_id: req.transfer_id,
            ack_rate,
            result_message,
        }
    }

    /// Handle one `TRANSFER_DATA` packet on a write (client-to-device)
    /// transfer. `None` means the packet was consumed silently (still
    /// inside the ACK window) and the dispatcher must send `NoResponse`.
    pub fn write_data<C: FileCallbacks>(
        &mut self,
        callbacks: &mut C,
        req: &FileTransferDataRequest,
        now_ms: u32,
    ) -> Option<FileTransferDataNotification> {
        if self.session.state != TransferState::Data || self.session.transfer_id != req.transfer_id {
            return Some(self.notification(ErrorCode::InvalidState, false, 0));
        }

        if req.message_number != self.session.next_message_number {
            let message = format!(
                "At {}, message number mismatch. Got {}, not {}",
                self.session.next_offset, req.message_number, self.session.next_message_number
            );
            let retry_offset = self.session.next_offset;
            // Resync the local counter to the client's claim so a legitimate
            // retry at this number isn't rejected again; request_offset is
            // left untouched (spec §9 item 2), the notification's
            // retry_offset is the device's own authoritative position.
            self.session.next_message_number = req.message_number;
            return Some(self.notification_with_message(ErrorCode::PacketCountErr, false, retry_offset, message));
        }

        if self.session.use_checksum {
            let computed = internet_checksum(&req.message_data);
            if u32::from(computed) != req.checksum {
                return Some(self.notification(ErrorCode::ChecksumMismatch, false, self.session.next_offset));
            }
        }

        if callbacks
            .write_file(self.session.file_id, req.offset, &req.message_data)
            .is_err()
        {
            return Some(self.notification(ErrorCode::WriteFailed, false, self.session.next_offset));
        }

        self.watchdog.stroke(now_ms);
        self.session.next_offset = req.offset + req.message_data.len() as u32;
        self.session.next_message_number += 1;
        self.session.ack_window_remaining = self.session.ack_window_remaining.saturating_sub(1);

        if self.session.bytes_remaining() == 0 {
            self.session.state = TransferState::Complete;
            self.watchdog.end();
            let result = match callbacks.file_transfer_complete(self.session.file_id) {
                Ok(()) => ErrorCode::NoError,
                Err(err) => err.code(),
            };
            return Some(self.notification(result, true, self.session.next_offset));
        }

        if self.session.ack_window_remaining == 0 {
            self.session.ack_window_remaining = self.session.ack_rate;
            return Some(self.notification(ErrorCode::NoError, false, self.session.next_offset));
        }

        None
    }

    /// Emit the next read-direction (device-to-client) data chunk, driven by
    /// the continuation engine rather than an inbound request.
    pub fn next_read_chunk<C: FileCallbacks>(
        &mut self,
        callbacks: &mut C,
        now_ms: u32,
    ) -> Result<(FileTransferDataRequest, u32)> {
        if self.session.state != TransferState::Data {
            return Err(ReachError::InvalidState);
        }
        let remaining = self.session.bytes_remaining();
        let len = remaining.min(REACH_BYTES_IN_A_FILE_PACKET as u32) as usize;
        let mut buf = vec![0u8; len];
        let read = callbacks.read_file(self.session.file_id, self.session.next_offset, &mut buf)?;
        buf.truncate(read);

        let checksum = if self.session.use_checksum {
            u32::from(internet_checksum(&buf))
        } else {
            0
        };

        let chunk = FileTransferDataRequest {
            transfer_id: self.session.transfer_id,
            message_number: self.session.next_message_number,
            offset: self.session.next_offset,
            message_data: buf,
            checksum,
        };

        self.session.next_offset += read as u32;
        self.session.next_message_number += 1;
        self.session.ack_window_remaining = self.session.ack_window_remaining.saturating_sub(1);
        self.watchdog.stroke(now_ms);

        let remaining_after = self.session.bytes_remaining();
        if remaining_after == 0 {
            self.session.state = TransferState::Complete;
            self.watchdog.end();
        }
        Ok((chunk, remaining_after))
    }

    /// `true` once `next_read_chunk` has emitted `ack_rate` packets without
    /// a client ACK in between — the continuation must pause and wait for
    /// a `TRANSFER_DATA_NOTIFICATION` (invariant 7, ACK pacing).
    pub const fn read_window_exhausted(&self) -> bool {
        self.session.ack_window_remaining == 0
    }

    /// `true` while a read-direction transfer is mid-flight (not yet
    /// drained), i.e. there is more to push once the window reopens.
    pub fn read_in_progress(&self) -> bool {
        self.session.state == TransferState::Data && self.session.direction == TransferDirection::TransferRead
    }

    /// Handle a client's `TRANSFER_DATA_NOTIFICATION` ACK on a read-direction
    /// transfer. `is_complete` is the client's own completion flag, echoing
    /// the drain the device already observed.
    /// Returns `Some` with a reply to send when the client is confirming
    /// completion (state moves to `Idle`); `None` means "window reopened,
    /// resume the continuation".
    pub fn on_read_ack(&mut self, is_complete: bool, now_ms: u32) -> Option<FileTransferDataNotification> {
        if is_complete {
            let notif = self.notification(ErrorCode::NoError, true, self.session.next_offset);
            self.session.state = TransferState::Idle;
            self.watchdog.end();
            return Some(notif);
        }
        self.session.ack_window_remaining = self.session.ack_rate;
        self.watchdog.stroke(now_ms);
        None
    }

    pub const fn transfer_id(&self) -> u32 {
        self.session.transfer_id
    }

    /// Check the session's timeout watchdog; call once per tick.
    pub fn check_watchdog(&mut self, now_ms: u32) -> Option<FileTransferDataNotification> {
        if self.session.state == TransferState::Data && self.watchdog.check(now_ms) {
            self.session.state = TransferState::Idle;
            self.watchdog.end();
            return Some(self.notification(ErrorCode::Incomplete, true, self.session.next_offset));
        }
        None
    }

    pub fn erase<C: FileCallbacks>(&mut self, callbacks: &mut C, file_id: u32) -> EraseFileResponse {
        let result = match callbacks.erase_file(file_id) {
            Ok(()) => ErrorCode::NoError,
            Err(err) => err.code(),
        };
        EraseFileResponse { result: result as i32 }
    }

    pub fn abort(&mut self) {
        self.session.state = TransferState::Idle;
        self.watchdog.end();
    }

    pub fn reset_on_disconnect(&mut self) {
        self.abort();
        self.pending_discover = None;
    }

    fn notification(&self, result: ErrorCode, is_complete: bool, retry_offset: u32) -> FileTransferDataNotification {
        self.notification_with_message(result, is_complete, retry_offset, String::new())
    }

    fn notification_with_message(
        &self,
        result: ErrorCode,
        is_complete: bool,
        retry_offset: u32,
        result_message: String,
    ) -> FileTransferDataNotification {
        FileTransferDataNotification {
            transfer_id: self.session.transfer_id,
            result: result as i32,
            is_complete,
            retry_offset,
            result_message,
            bytes_transferred: self.session.next_offset,
        }
    }
}
