//! Switching to the target uid/gid

use log::debug;
use nix::unistd::{Gid, Uid, setgroups, setresgid, setresuid};
use tilerun_core::{Result, TileError, util};

/// Permanently switch real, effective and saved ids to `uid`/`gid`.
///
/// The group is changed first, while the process may still hold the
/// privilege to do so. Supplementary groups are reset when running as root.
pub fn drop_privileges(uid: u32, gid: u32) -> Result<()> {
    let gid = Gid::from_raw(gid);
    let uid = Uid::from_raw(uid);

    if util::is_root() {
        setgroups(&[gid]).map_err(|e| TileError::Syscall(format!("setgroups failed: {}", e)))?;
    }

    setresgid(gid, gid, gid)
        .map_err(|e| TileError::Syscall(format!("setresgid({}) failed: {}", gid, e)))?;
    setresuid(uid, uid, uid)
        .map_err(|e| TileError::Syscall(format!("setresuid({}) failed: {}", uid, e)))?;

    debug!("running as uid={} gid={}", uid, gid);
    Ok(())
}
