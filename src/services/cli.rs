//! Remote CLI service: forwards inbound lines to the device's CLI backend
//! and queues any resulting output for the engine to push back out as
//! `CLI_NOTIFICATION`s.

use core::fmt::Write as _;

use crate::callbacks::CliCallbacks;
use crate::codec::proto::CliNotification;

/// A small outbound ring the engine drains one line per `process(tick)`,
/// since a single continuation slot cannot represent free-form CLI chatter
/// the way it represents a counted list.
#[derive(Default)]
pub struct CliService {
    outbox: Vec<String>,
    echo: bool,
}

impl CliService {
    pub fn new(echo_on_default: bool) -> Self {
        Self {
            outbox: Vec::new(),
            echo: echo_on_default,
        }
    }

    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Forward one inbound line; any echo is queued for later emission.
    pub fn handle_line<C: CliCallbacks>(&mut self, callbacks: &mut C, line: &str) {
        if self.echo {
            let mut echoed = String::new();
            let _ = write!(echoed, "> {line}");
            self.outbox.push(echoed);
        }
        if callbacks.cli_enter(line).is_err() {
            self.outbox.push(format!("cli: unhandled line {line:?}"));
        }
    }

    /// Queue a line of CLI output produced by the device outside of a
    /// direct request/response cycle (e.g. log lines, async command output).
    pub fn push_output(&mut self, line: impl Into<String>) {
        self.outbox.push(line.into());
    }

    pub fn take_next(&mut self) -> Option<CliNotification> {
        if self.outbox.is_empty() {
            None
        } else {
            Some(CliNotification {
                line: self.outbox.remove(0),
            })
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.outbox.is_empty()
    }

    pub fn reset_on_disconnect(&mut self) {
        self.outbox.clear();
    }
}
