//! Error report path: turns a [`ReachError`] into the wire `ErrorReport`
//! one of the three verbosity profiles calls for, and always logs it
//! locally regardless of profile.

use crate::codec::proto::ErrorReport;
use crate::config::{ErrorReportFormat, REACH_BYTES_IN_A_FILE_PACKET};
use crate::error::ReachError;
use crate::logging::MaskedLog;

/// Build the report to send for `error`, if the profile sends one at all.
/// `detail` is the richer, code-site-supplied context (`Full` only);
/// `LogOnly`/`Short` ignore it on the wire but still log it locally.
pub fn build_report(log: &MaskedLog, format: ErrorReportFormat, error: ReachError, detail: &str) -> Option<ErrorReport> {
    log.log(
        log::Level::Error,
        format_args!("reach error: {error} ({detail})"),
    );

    match format {
        ErrorReportFormat::LogOnly => None,
        ErrorReportFormat::Short => Some(ErrorReport {
            result: error.code() as i32,
            message: format!("Error {}.", error.code() as i32),
        }),
        ErrorReportFormat::Full => {
            let mut message = format!("{error}: {detail}");
            truncate_to_char_boundary(&mut message, REACH_BYTES_IN_A_FILE_PACKET - 1);
            Some(ErrorReport {
                result: error.code() as i32,
                message,
            })
        }
    }
}

fn truncate_to_char_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
