//! How a child process ended

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use std::fmt;

/// Final state of a reaped child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited through exit/exit_group with this code
    Exited(i32),
    /// Killed by this signal number
    Signaled(i32),
}

impl Termination {
    /// Terminal states only; stops and continues are `None`.
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Termination::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Termination::Signaled(signal as i32)),
            _ => None,
        }
    }

    /// Exit code a supervisor reports after losing this child.
    ///
    /// A child that leaves on its own is always a failure, so a clean exit
    /// still maps to 1. Signals map to their number.
    pub fn group_exit_code(self) -> i32 {
        match self {
            Termination::Signaled(0) | Termination::Exited(0) => 1,
            Termination::Signaled(signal) => signal,
            Termination::Exited(code) => code,
        }
    }

    /// Short signal name, e.g. `SIGKILL`
    pub fn signal_name(signal: i32) -> &'static str {
        Signal::try_from(signal)
            .map(|s| s.as_str())
            .unwrap_or("unknown signal")
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Termination::Exited(code) => write!(f, "exited with code {}", code),
            Termination::Signaled(signal) => write!(
                f,
                "exited with signal {} ({})",
                signal,
                Self::signal_name(signal)
            ),
        }
    }
}
