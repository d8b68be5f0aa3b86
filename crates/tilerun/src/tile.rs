//! Tile descriptors and the per-process state handed to tile hooks

use crate::workspace::{Workspace, WorkspaceProvider};
use std::fmt;
use std::os::fd::RawFd;
use std::sync::Arc;
use tilerun_core::Result;

/// Most descriptors a tile may keep once sandboxed
pub const MAX_ALLOWED_FDS: usize = 32;

/// One-time setup, run before the sandbox is entered
pub type InitFn = fn(&mut TileContext) -> Result<()>;

/// Descriptors to keep, given the maximum the caller accepts
pub type AllowFdsFn = fn(&TileContext, usize) -> Vec<RawFd>;

/// Tile main loop; expected to run until the process is killed
pub type RunFn = fn(&TileContext) -> Result<()>;

/// Static definition of a tile role, shared by every replica
pub struct TileDescriptor {
    pub name: &'static str,
    /// Shared workspace this tile consumes from
    pub in_wksp: Option<&'static str>,
    /// Shared workspace this tile produces into
    pub out_wksp: Option<&'static str>,
    pub extra_wksp: Option<&'static str>,
    pub init: Option<InitFn>,
    pub allow_fds: AllowFdsFn,
    pub allow_syscalls: &'static [i64],
    pub run: RunFn,
}

impl TileDescriptor {
    /// Shared workspace names this role attaches to, in in/out/extra order
    pub fn shared_workspaces(&self) -> impl Iterator<Item = &'static str> {
        [self.in_wksp, self.out_wksp, self.extra_wksp]
            .into_iter()
            .flatten()
    }
}

impl fmt::Debug for TileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileDescriptor")
            .field("name", &self.name)
            .field("in_wksp", &self.in_wksp)
            .field("out_wksp", &self.out_wksp)
            .field("extra_wksp", &self.extra_wksp)
            .field("has_init", &self.init.is_some())
            .field("allow_syscalls", &self.allow_syscalls.len())
            .finish()
    }
}

/// Keep stderr and, if configured, the log file.
///
/// The usual `allow_fds` hook for tiles that only log.
pub fn stderr_and_log(ctx: &TileContext, max: usize) -> Vec<RawFd> {
    let mut fds = vec![libc::STDERR_FILENO];
    fds.extend(ctx.log_fd);
    fds.truncate(max);
    fds
}

/// Everything a tile process is started with.
///
/// Built by the spawner and moved into the child; the parent keeps nothing.
pub struct TileArgs {
    pub app_name: String,
    /// Index among tiles of the same role
    pub replica: usize,
    /// Global spawn position, also the affinity table index
    pub ordinal: usize,
    pub descriptor: &'static TileDescriptor,
    pub sandbox: bool,
    pub uid: u32,
    pub gid: u32,
    pub tick_per_ns: f64,
    pub log_fd: Option<RawFd>,
    pub workspaces: Arc<dyn WorkspaceProvider>,
}

/// State visible to tile hooks once workspaces are attached
#[derive(Debug)]
pub struct TileContext {
    pub app_name: String,
    pub name: &'static str,
    pub replica: usize,
    pub ordinal: usize,
    /// Pid as seen from the host
    pub pid: i32,
    pub tick_per_ns: f64,
    pub log_fd: Option<RawFd>,
    /// Private workspace of this replica
    pub workspace: Workspace,
    pub in_workspace: Option<Workspace>,
    pub out_workspace: Option<Workspace>,
    pub extra_workspace: Option<Workspace>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle(_: &TileContext) -> Result<()> {
        Ok(())
    }

    static DESC: TileDescriptor = TileDescriptor {
        name: "verify",
        in_wksp: Some("quic_verify"),
        out_wksp: Some("verify_dedup"),
        extra_wksp: None,
        init: None,
        allow_fds: stderr_and_log,
        allow_syscalls: &[libc::SYS_write],
        run: idle,
    };

    #[test]
    fn shared_workspaces_skip_missing_slots() {
        let names: Vec<_> = DESC.shared_workspaces().collect();
        assert_eq!(names, ["quic_verify", "verify_dedup"]);
    }

    #[test]
    fn debug_output_names_the_role() {
        let debug = format!("{:?}", DESC);
        assert!(debug.contains("verify"));
        assert!(debug.contains("has_init: false"));
    }
}
