//! Parameter service: discovery, extended discovery, read, write,
//! notification configuration and the change-driven notify scan.

use crate::callbacks::{ParameterCallbacks, ServiceId};
use crate::codec::proto::{
    parameter_value, NotificationInfo, ParamExInfo, ParamExLabel, ParameterInfo,
    ParameterInfoResponse, ParameterReadResult, ParameterValue,
};
use crate::config::{
    NUM_SUPPORTED_PARAM_NOTIFY, REACH_COUNT_PARAM_DESC_IN_RESPONSE, REACH_COUNT_PARAM_EX_LABELS,
    REACH_COUNT_PARAM_READ_VALUES,
};
use crate::error::{ReachError, Result};

/// A single slot in the notification-configuration table, with its
/// per-slot "last observed" companion value and timestamp.
#[derive(Debug, Clone)]
struct NotifySlot {
    parameter_id: u32,
    min_period_ms: u32,
    max_period_ms: u32,
    min_delta: f32,
    last_value: ParameterValue,
    last_timestamp_ms: u32,
}

/// A buffered, cursor-advancing list used to serve a request that may need
/// more than one `process(tick)` to fully emit.
#[derive(Debug, Default)]
struct PendingList<T> {
    items: Vec<T>,
    cursor: usize,
}

impl<T: Clone> PendingList<T> {
    fn new(items: Vec<T>) -> Self {
        Self { items, cursor: 0 }
    }

    /// Take up to `n` more items, returning them plus the count still left.
    fn take(&mut self, n: usize) -> (Vec<T>, u32) {
        let end = (self.cursor + n).min(self.items.len());
        let chunk = self.items[self.cursor..end].to_vec();
        self.cursor = end;
        let remaining = (self.items.len() - self.cursor) as u32;
        (chunk, remaining)
    }
}

#[derive(Default)]
pub struct ParameterService {
    pending_discover: Option<PendingList<ParameterInfo>>,
    pending_discover_ex: Option<PendingList<(u32, i32, ParamExLabel)>>,
    pending_read: Option<PendingList<ParameterValue>>,
    pending_notify_discover: Option<PendingList<NotificationInfo>>,
    notify_slots: [Option<NotifySlot>; NUM_SUPPORTED_PARAM_NOTIFY],
}

fn numeric_delta(a: &ParameterValue, b: &ParameterValue) -> f32 {
    use parameter_value::Value as V;
    match (&a.value, &b.value) {
        (Some(V::Uint32Value(x)), Some(V::Uint32Value(y))) => (*x as i64 - *y as i64).unsigned_abs() as f32,
        (Some(V::Int32Value(x)), Some(V::Int32Value(y))) => (x - y).unsigned_abs() as f32,
        (Some(V::Float32Value(x)), Some(V::Float32Value(y))) => (x - y).abs(),
        (Some(V::Uint64Value(x)), Some(V::Uint64Value(y))) => x.abs_diff(*y) as f32,
        (Some(V::Int64Value(x)), Some(V::Int64Value(y))) => (x - y).unsigned_abs() as f32,
        (Some(V::Float64Value(x)), Some(V::Float64Value(y))) => (x - y).abs() as f32,
        (Some(V::BoolValue(x)), Some(V::BoolValue(y))) => {
            if x == y {
                0.0
            } else {
                f32::INFINITY
            }
        }
        (Some(V::StringValue(x)), Some(V::StringValue(y))) => {
            if x == y {
                0.0
            } else {
                f32::INFINITY
            }
        }
        (Some(V::BytesValue(x)), Some(V::BytesValue(y))) => {
            if x == y {
                0.0
            } else {
                f32::INFINITY
            }
        }
        (Some(V::EnumValue(x)), Some(V::EnumValue(y))) | (Some(V::BitfieldValue(x)), Some(V::BitfieldValue(y))) => {
            if x == y {
                0.0
            } else {
                f32::INFINITY
            }
        }
        _ => f32::INFINITY,
    }
}

impl ParameterService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_notifications(&mut self) {
        self.notify_slots = Default::default();
    }

    fn cancel_continuations(&mut self) {
        self.pending_discover = None;
        self.pending_discover_ex = None;
        self.pending_read = None;
        self.pending_notify_discover = None;
    }

    /// Start (or continue) `DISCOVER_PARAMETERS`. `filter` is empty to mean
    /// "all parameters".
    pub fn discover<C: ParameterCallbacks>(
        &mut self,
        callbacks: &mut C,
        filter: &[u32],
    ) -> (ParameterInfoResponse, u32) {
        if self.pending_discover.is_none() {
            callbacks.discover_reset(filter);
            let mut items = Vec::new();
            while let Some(info) = callbacks.discover_next() {
                items.push(info);
            }
            self.pending_discover = Some(PendingList::new(items));
        }
        let pending = self.pending_discover.as_mut().expect("just set");
        let (chunk, remaining) = pending.take(REACH_COUNT_PARAM_DESC_IN_RESPONSE);
        if remaining == 0 {
            self.pending_discover = None;
        }
        (
            ParameterInfoResponse {
                parameters: chunk,
                remaining_objects: remaining,
            },
            remaining,
        )
    }

    /// Start (or continue) `DISCOVER_PARAM_EX`, chunked at
    /// `REACH_COUNT_PARAM_EX_LABELS` labels per response, regrouped by
    /// parameter id on the way out.
    pub fn discover_ex<C: ParameterCallbacks>(
        &mut self,
        callbacks: &mut C,
        filter: &[u32],
    ) -> (Vec<ParamExInfo>, u32) {
        if self.pending_discover_ex.is_none() {
            let mut flat = Vec::new();
            callbacks.discover_reset(filter);
            while let Some(info) = callbacks.discover_next() {
                let pei_id = info.id;
                let data_type = info.data_type;
                callbacks.ex_discover_reset(pei_id);
                while let Some(label) = callbacks.ex_discover_next() {
                    flat.push((pei_id, data_type, label));
                }
            }
            self.pending_discover_ex = Some(PendingList::new(flat));
        }
        let pending = self.pending_discover_ex.as_mut().expect("just set");
        let (chunk, remaining) = pending.take(REACH_COUNT_PARAM_EX_LABELS);
        if remaining == 0 {
            self.pending_discover_ex = None;
        }

        let mut grouped: Vec<ParamExInfo> = Vec::new();
        for (pei_id, data_type, label) in chunk {
            if let Some(last) = grouped.last_mut() {
                if last.pei_id == pei_id {
                    last.labels.push(label);
                    continue;
                }
            }
            grouped.push(ParamExInfo {
                pei_id,
                data_type,
                labels: vec![label],
            });
        }
        (grouped, remaining)
    }

    /// Start (or continue) `READ_PARAMETERS`. A missing/forbidden id gets a
    /// default-valued entry carrying only `parameter_id`, and the batch is
    /// not aborted.
    pub fn read<C: ParameterCallbacks>(&mut self, callbacks: &mut C, ids: &[u32]) -> (ParameterReadResult, u32) {
        if self.pending_read.is_none() {
            let values = ids
                .iter()
                .map(|&pid| {
                    callbacks.parameter_read(pid).unwrap_or(ParameterValue {
                        parameter_id: pid,
                        value: None,
                    })
                })
                .collect();
            self.pending_read = Some(PendingList::new(values));
        }
        let pending = self.pending_read.as_mut().expect("just set");
        let (chunk, remaining) = pending.take(REACH_COUNT_PARAM_READ_VALUES);
        if remaining == 0 {
            self.pending_read = None;
        }
        (
            ParameterReadResult {
                values: chunk,
                remaining_objects: remaining,
            },
            remaining,
        )
    }

    /// Apply each value in order; non-transactional, by explicit design —
    /// a single failure fails the whole request but already-applied values
    /// are not rolled back.
    pub fn write<C: ParameterCallbacks>(
        &self,
        callbacks: &mut C,
        values: &[ParameterValue],
    ) -> Result<()> {
        for value in values {
            callbacks.parameter_write(value)?;
        }
        Ok(())
    }

    pub fn enable_notify<C: ParameterCallbacks>(
        &mut self,
        callbacks: &C,
        now_ms: u32,
        parameter_id: u32,
        min_period_ms: u32,
        max_period_ms: u32,
        min_delta: f32,
    ) -> Result<()> {
        if callbacks.parameter_read(parameter_id).is_err() {
            return Err(ReachError::InvalidParameter);
        }
        let initial = callbacks
            .parameter_read(parameter_id)
            .unwrap_or(ParameterValue {
                parameter_id,
                value: None,
            });

        if let Some(slot) = self
            .notify_slots
            .iter_mut()
            .flatten()
            .find(|slot| slot.parameter_id == parameter_id)
        {
            slot.min_period_ms = min_period_ms;
            slot.max_period_ms = max_period_ms;
            slot.min_delta = min_delta;
            return Ok(());
        }

        let free = self.notify_slots.iter_mut().find(|s| s.is_none());
        match free {
            Some(slot) => {
                *slot = Some(NotifySlot {
                    parameter_id,
                    min_period_ms,
                    max_period_ms,
                    min_delta,
                    last_value: initial,
                    last_timestamp_ms: now_ms,
                });
                Ok(())
            }
            None => Err(ReachError::NoResource),
        }
    }

    /// Idempotent: clearing an id with no active slot still returns `Ok`.
    pub fn disable_notify(&mut self, parameter_id: u32) {
        for slot in &mut self.notify_slots {
            if slot.as_ref().is_some_and(|s| s.parameter_id == parameter_id) {
                *slot = None;
            }
        }
    }

    pub fn discover_notifications(&mut self) -> (Vec<NotificationInfo>, u32) {
        if self.pending_notify_discover.is_none() {
            let items = self
                .notify_slots
                .iter()
                .flatten()
                .map(|slot| NotificationInfo {
                    parameter_id: slot.parameter_id,
                    enabled: true,
                    min_period_ms: slot.min_period_ms,
                    max_period_ms: slot.max_period_ms,
                    min_delta: slot.min_delta,
                })
                .collect();
            self.pending_notify_discover = Some(PendingList::new(items));
        }
        let pending = self.pending_notify_discover.as_mut().expect("just set");
        let (chunk, remaining) = pending.take(REACH_COUNT_PARAM_READ_VALUES);
        if remaining == 0 {
            self.pending_notify_discover = None;
        }
        (chunk, remaining)
    }

    /// Run one notify-scan pass over the configured slots. Returns the
    /// parameter values that should be emitted as `PARAMETER_NOTIFICATION`s
    /// this tick.
    pub fn scan<C: ParameterCallbacks>(&mut self, callbacks: &C, now_ms: u32) -> Vec<ParameterValue> {
        let mut due = Vec::new();
        for slot in self.notify_slots.iter_mut().flatten() {
            let age = now_ms.wrapping_sub(slot.last_timestamp_ms);
            if age < slot.min_period_ms {
                continue;
            }
            let Ok(current) = callbacks.parameter_read(slot.parameter_id) else {
                continue;
            };
            let delta = numeric_delta(&slot.last_value, &current);
            let period_triggers = slot.max_period_ms != 0 && age >= slot.max_period_ms;
            if delta >= slot.min_delta || period_triggers {
                due.push(current.clone());
                slot.last_value = current;
                slot.last_timestamp_ms = now_ms;
            }
        }
        due
    }

    pub fn reset_on_disconnect(&mut self) {
        self.cancel_continuations();
        self.clear_notifications();
    }
}

/// Per-object access-gate service id for parameter operations, exposed for
/// the dispatcher to combine with [`crate::access::AccessGate`].
pub const SERVICE: ServiceId = ServiceId::Parameter;
