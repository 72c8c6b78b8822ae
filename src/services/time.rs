//! Time service: a thin passthrough to the device's own clock.

use crate::callbacks::TimeCallbacks;
use crate::codec::proto::{ErrorCode, GetTimeResponse, SetTimeResponse};

pub struct TimeService;

impl TimeService {
    pub fn get<C: TimeCallbacks>(callbacks: &C) -> GetTimeResponse {
        GetTimeResponse {
            utc_seconds: callbacks.time_get(),
        }
    }

    pub fn set<C: TimeCallbacks>(callbacks: &mut C, utc_seconds: u64) -> SetTimeResponse {
        let result = match callbacks.time_set(utc_seconds) {
            Ok(()) => ErrorCode::NoError,
            Err(err) => err.code(),
        };
        SetTimeResponse { result: result as i32 }
    }
}
