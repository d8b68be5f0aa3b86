//! Shutdown signal handling
//!
//! Handlers here run in signal context: they only touch atomics and call
//! `kill`, `write` and `exit_group`.

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::unistd::Pid;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicI32, Ordering};
use tilerun_core::{Result, TileError, util};

const SHUTDOWN_SIGNALS: [Signal; 2] = [Signal::SIGTERM, Signal::SIGINT];

/// Pid of the namespace leader, 0 until it exists
static LEADER_PID: AtomicI32 = AtomicI32::new(0);
static LOG_PATH: OnceLock<CString> = OnceLock::new();

/// Remember where logs go, for messages printed from signal context
pub fn set_log_path(path: Option<&Path>) {
    if let Some(path) = path
        && let Ok(path) = CString::new(path.as_os_str().as_bytes())
    {
        let _ = LOG_PATH.set(path);
    }
}

/// Publish the leader pid to the operator signal handler
pub fn set_leader(pid: Pid) {
    LEADER_PID.store(pid.as_raw(), Ordering::SeqCst);
}

/// Print `Log at "<path>"` if a log file was configured
pub fn write_log_location() {
    if let Some(path) = LOG_PATH.get() {
        util::write_stderr_bytes(b"Log at \"");
        util::write_stderr_bytes(path.as_bytes());
        util::write_stderr_bytes(b"\"\n");
    }
}

/// SIGTERM/SIGINT on the top-level process: kill the leader (taking every
/// tile with it), say where the log is, exit 0.
pub fn install_operator_handlers() -> Result<()> {
    install(SigHandler::Handler(on_operator_signal))
}

/// SIGTERM/SIGINT on a tile: exit 0 immediately.
pub fn install_tile_handlers() -> Result<()> {
    install(SigHandler::Handler(on_tile_signal))
}

/// Restore default dispositions inherited from the parent
pub fn reset_to_default() -> Result<()> {
    install(SigHandler::SigDfl)
}

fn install(handler: SigHandler) -> Result<()> {
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    for signal in SHUTDOWN_SIGNALS {
        // SAFETY: handlers installed here are async-signal-safe
        unsafe { sigaction(signal, &action) }
            .map_err(|e| TileError::Syscall(format!("sigaction({}) failed: {}", signal, e)))?;
    }
    Ok(())
}

/// SIGKILL the namespace leader and every process in its group.
///
/// The leader goes first so it cannot spawn more tiles. Its group outlives
/// it while any member does. Async-signal-safe.
pub fn kill_leader_group(leader: Pid) {
    let leader = leader.as_raw();
    if leader <= 0 {
        return;
    }
    // SAFETY: kill is async-signal-safe
    unsafe {
        libc::kill(leader, libc::SIGKILL);
        libc::kill(-leader, libc::SIGKILL);
    }
}

extern "C" fn on_operator_signal(_: libc::c_int) {
    kill_leader_group(Pid::from_raw(LEADER_PID.load(Ordering::SeqCst)));
    write_log_location();
    util::exit_group(0);
}

extern "C" fn on_tile_signal(_: libc::c_int) {
    util::exit_group(0);
}
