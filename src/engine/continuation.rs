//! Continuation engine: a single `{kind, remaining}` slot that lets a
//! logically single reply span multiple `process(tick)` calls without an
//! unbounded queue.
//!
//! The slot only tracks *which* service is mid-continuation and how much
//! work remains; the paused iteration state itself (cursor position,
//! buffered chunk) lives inside that service's own struct, since its shape
//! differs per kind (a parameter list vs. a file-transfer offset are not
//! the same thing).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationKind {
    ParameterDiscover,
    ParameterDiscoverEx,
    ParameterRead,
    NotificationsDiscover,
    FileDiscover,
    CommandDiscover,
    WifiDiscover,
    FileData,
}

#[derive(Debug, Default)]
pub struct Continuation {
    active: Option<ContinuationKind>,
    remaining: u32,
}

impl Continuation {
    pub const fn new() -> Self {
        Self {
            active: None,
            remaining: 0,
        }
    }

    /// Begin (or replace) the active continuation. Only one kind is active
    /// at a time; starting a new one cancels the prior.
    pub fn start(&mut self, kind: ContinuationKind, remaining: u32) {
        if remaining == 0 {
            self.active = None;
            self.remaining = 0;
        } else {
            self.active = Some(kind);
            self.remaining = remaining;
        }
    }

    /// Update the remaining count after emitting another chunk; closes the
    /// continuation once it reaches zero.
    pub fn set_remaining(&mut self, remaining: u32) {
        self.remaining = remaining;
        if remaining == 0 {
            self.active = None;
        }
    }

    pub fn clear(&mut self) {
        self.active = None;
        self.remaining = 0;
    }

    pub const fn active_kind(&self) -> Option<ContinuationKind> {
        self.active
    }

    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }
}
