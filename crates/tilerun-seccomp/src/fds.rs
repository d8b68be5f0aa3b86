//! File descriptor allow-lists

use log::debug;
use std::collections::BTreeSet;
use std::os::fd::RawFd;
use tilerun_core::{Result, TileError};

/// Descriptors currently open in this process, lowest first
pub fn open_descriptors() -> Result<Vec<RawFd>> {
    let mut fds: Vec<RawFd> = std::fs::read_dir("/proc/self/fd")?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
        .collect();
    fds.sort_unstable();
    Ok(fds)
}

/// Close every descriptor not in `allowed`.
///
/// Every allowed descriptor must already be open.
pub fn restrict_descriptors(allowed: &BTreeSet<RawFd>) -> Result<()> {
    // The directory handle used for the listing is closed by the time
    // open_descriptors returns, so its number fails with EBADF below.
    let open = open_descriptors()?;

    for fd in allowed {
        if !open.contains(fd) {
            return Err(TileError::Configuration(format!(
                "allowed file descriptor {} is not open",
                fd
            )));
        }
    }

    for fd in open.into_iter().filter(|fd| !allowed.contains(fd)) {
        // SAFETY: closing a descriptor number owned by this process
        if unsafe { libc::close(fd) } == 0 {
            debug!("closed file descriptor {}", fd);
        }
    }
    Ok(())
}
