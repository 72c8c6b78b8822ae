//! Stream service: periodic subscription-driven telemetry push, layered on
//! top of the parameter notification scan rather than a separate wire
//! message — a push cadence, not a new payload shape.

/// Stream subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Not subscribed — the notify scan still runs per-parameter thresholds
    /// but no unconditional periodic push happens.
    Inactive,
    /// Actively streaming at the configured interval.
    Active { interval_ms: u32 },
    /// Paused, e.g. while the transport renegotiates a connection.
    Paused,
}

/// Tracks one elapsed-time accumulator gating how often the engine forces a
/// notify scan regardless of each parameter's own min/max period.
pub struct StreamService {
    state: StreamState,
    elapsed_ms: u32,
    dropped_count: u32,
}

impl Default for StreamService {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamService {
    pub fn new() -> Self {
        Self {
            state: StreamState::Inactive,
            elapsed_ms: 0,
            dropped_count: 0,
        }
    }

    pub fn subscribe(&mut self, interval_ms: u32) {
        self.state = StreamState::Active {
            interval_ms: interval_ms.max(1),
        };
        self.elapsed_ms = 0;
    }

    pub fn unsubscribe(&mut self) {
        self.state = StreamState::Inactive;
    }

    pub fn pause(&mut self) {
        if let StreamState::Active { .. } = self.state {
            self.state = StreamState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == StreamState::Paused {
            self.state = StreamState::Active { interval_ms: 1_000 };
            self.elapsed_ms = 0;
        }
    }

    /// Advance by `delta_ms`; `true` means the engine should run a forced
    /// notify scan this tick regardless of individual parameter cadences.
    pub fn tick(&mut self, delta_ms: u32) -> bool {
        match self.state {
            StreamState::Active { interval_ms } => {
                self.elapsed_ms += delta_ms;
                if self.elapsed_ms >= interval_ms {
                    self.elapsed_ms -= interval_ms;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    pub fn record_drop(&mut self) {
        self.dropped_count += 1;
    }

    pub const fn state(&self) -> StreamState {
        self.state
    }

    pub const fn dropped_count(&self) -> u32 {
        self.dropped_count
    }

    pub fn reset_on_disconnect(&mut self) {
        self.state = StreamState::Inactive;
        self.elapsed_ms = 0;
    }
}
