//! Process-local identity
//!
//! Every tilerun process (top-level, namespace leader, each tile) records a
//! numeric ordinal and a short name once it starts. Log lines and exit
//! diagnostics read it back. Storage is lock-free so it stays valid in a
//! child created by clone/fork from a multi-threaded parent.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Longest name the kernel keeps for a thread (`comm`), excluding the NUL.
pub const NAME_MAX: usize = 15;

/// Ordinal used by processes that are not tiles.
pub const SUPERVISOR_ORDINAL: usize = usize::MAX;

static ORDINAL: AtomicUsize = AtomicUsize::new(SUPERVISOR_ORDINAL);
static NAME_LEN: AtomicUsize = AtomicUsize::new(0);
static NAME: [AtomicU8; NAME_MAX] = [const { AtomicU8::new(0) }; NAME_MAX];

/// Record this process's identity and rename its main thread.
///
/// Names longer than [`NAME_MAX`] bytes are truncated on a char boundary.
pub fn set(ordinal: usize, name: &str) {
    let mut end = name.len().min(NAME_MAX);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let name = &name[..end];

    ORDINAL.store(ordinal, Ordering::Relaxed);
    for (slot, byte) in NAME.iter().zip(name.bytes()) {
        slot.store(byte, Ordering::Relaxed);
    }
    NAME_LEN.store(name.len(), Ordering::Release);

    set_thread_name(name);
}

/// Spawn ordinal of this process, `None` for supervisors.
pub fn ordinal() -> Option<usize> {
    match ORDINAL.load(Ordering::Relaxed) {
        SUPERVISOR_ORDINAL => None,
        ordinal => Some(ordinal),
    }
}

/// Name recorded by [`set`], or `"main"` when nothing was recorded.
pub fn name() -> String {
    let len = NAME_LEN.load(Ordering::Acquire);
    if len == 0 {
        return "main".to_string();
    }
    let bytes: Vec<u8> = NAME[..len]
        .iter()
        .map(|b| b.load(Ordering::Relaxed))
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// `name` or `name:ordinal`, as printed in log lines.
pub fn label() -> String {
    match ordinal() {
        Some(ordinal) => format!("{}:{}", name(), ordinal),
        None => name(),
    }
}

fn set_thread_name(name: &str) {
    let mut buf = [0u8; NAME_MAX + 1];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    // SAFETY: buf is NUL terminated and outlives the call
    let ret = unsafe { libc::prctl(libc::PR_SET_NAME, buf.as_ptr() as libc::c_ulong, 0, 0, 0) };
    if ret != 0 {
        log::debug!(
            "PR_SET_NAME({}) failed: {}",
            name,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_read_back_in_child() {
        // Runs in a fork so the test harness thread keeps its own name.
        unsafe {
            let pid = libc::fork();
            assert!(pid >= 0, "fork failed");
            if pid == 0 {
                set(3, "verify");
                let ok = ordinal() == Some(3) && name() == "verify" && label() == "verify:3";
                let comm = std::fs::read_to_string("/proc/self/comm").unwrap_or_default();
                libc::_exit(if ok && comm.trim() == "verify" { 0 } else { 1 });
            }
            let mut status = 0;
            libc::waitpid(pid, &mut status, 0);
            assert!(libc::WIFEXITED(status));
            assert_eq!(libc::WEXITSTATUS(status), 0);
        }
    }

    #[test]
    fn long_names_are_truncated() {
        unsafe {
            let pid = libc::fork();
            assert!(pid >= 0, "fork failed");
            if pid == 0 {
                set(SUPERVISOR_ORDINAL, "a-very-long-tile-name");
                let ok = name() == "a-very-long-til" && ordinal().is_none();
                libc::_exit(if ok { 0 } else { 1 });
            }
            let mut status = 0;
            libc::waitpid(pid, &mut status, 0);
            assert_eq!(libc::WEXITSTATUS(status), 0);
        }
    }
}
