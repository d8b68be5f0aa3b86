//! Small process helpers shared by supervisors and tiles
//!
//! The `write_*` and `exit_group` helpers neither allocate nor take locks, so
//! they stay usable from signal handlers and after a seccomp filter that only
//! permits `write` and `exit_group`.

use crate::{Result, TileError};
use std::fmt;
use std::io::Write;

/// Bytes available to a single diagnostic line written with [`write_stderr`].
const LINE_MAX: usize = 512;

pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

pub fn get_uid() -> u32 {
    unsafe { libc::getuid() }
}

pub fn get_gid() -> u32 {
    unsafe { libc::getgid() }
}

/// Real pid of the calling process, read through `/proc/self`.
///
/// Inside a new PID namespace `getpid()` reports the namespaced pid, while the
/// `/proc/self` link resolves through the mounted procfs, which is the host
/// view for tiles that never remount `/proc`.
pub fn getpid1() -> Result<i32> {
    let target = std::fs::read_link("/proc/self")?;
    let raw = target.to_string_lossy();
    raw.trim()
        .parse::<i32>()
        .map_err(|_| TileError::Syscall(format!("unexpected /proc/self target '{}'", raw)))
}

/// Write raw bytes to stderr with a single `write(2)`.
pub fn write_stderr_bytes(bytes: &[u8]) {
    // SAFETY: bytes is a valid slice for the duration of the call
    unsafe {
        libc::write(
            libc::STDERR_FILENO,
            bytes.as_ptr() as *const libc::c_void,
            bytes.len(),
        );
    }
}

/// Format into a stack buffer and write the result to stderr.
///
/// Output longer than the buffer is truncated.
pub fn write_stderr(args: fmt::Arguments<'_>) {
    let mut buf = [0u8; LINE_MAX];
    let len = {
        let mut cursor = std::io::Cursor::new(&mut buf[..]);
        let _ = cursor.write_fmt(args);
        cursor.position() as usize
    };
    write_stderr_bytes(&buf[..len]);
}

/// Terminate every thread of the process immediately, skipping atexit
/// handlers and stdio flushing.
pub fn exit_group(code: i32) -> ! {
    unsafe { libc::_exit(code) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getpid1_matches_getpid_outside_namespaces() {
        let pid = getpid1().unwrap();
        assert_eq!(pid, std::process::id() as i32);
    }

    #[test]
    fn root_detection_matches_euid() {
        assert_eq!(is_root(), unsafe { libc::geteuid() } == 0);
    }

    #[test]
    fn write_stderr_truncates_long_lines() {
        let long = "x".repeat(LINE_MAX * 2);
        write_stderr(format_args!("{}\n", long));
    }

    #[test]
    fn exit_group_reports_code() {
        unsafe {
            let pid = libc::fork();
            assert!(pid >= 0, "fork failed");
            if pid == 0 {
                exit_group(42);
            }
            let mut status = 0;
            libc::waitpid(pid, &mut status, 0);
            assert!(libc::WIFEXITED(status));
            assert_eq!(libc::WEXITSTATUS(status), 42);
        }
    }
}
