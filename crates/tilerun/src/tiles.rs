//! Built-in pipeline tiles
//!
//! Each role attaches to its workspaces and then parks until the group is
//! torn down. Stage logic plugs in through the `run` hook.

use crate::tile::{TileContext, TileDescriptor, stderr_and_log};
use crate::topology::PipelineRoles;
use log::info;
use std::time::Duration;
use tilerun_core::Result;

/// Syscalls a parked tile needs: logging, sleeping and exiting
const PARKED_SYSCALLS: &[i64] = &[
    libc::SYS_write,
    libc::SYS_nanosleep,
    libc::SYS_clock_nanosleep,
    libc::SYS_restart_syscall,
    libc::SYS_rt_sigreturn,
    libc::SYS_exit_group,
];

pub static QUIC: TileDescriptor = TileDescriptor {
    name: "quic",
    in_wksp: None,
    out_wksp: Some("quic_verify"),
    extra_wksp: None,
    init: Some(announce),
    allow_fds: stderr_and_log,
    allow_syscalls: PARKED_SYSCALLS,
    run: park,
};

pub static VERIFY: TileDescriptor = TileDescriptor {
    name: "verify",
    in_wksp: Some("quic_verify"),
    out_wksp: Some("verify_dedup"),
    extra_wksp: None,
    init: Some(announce),
    allow_fds: stderr_and_log,
    allow_syscalls: PARKED_SYSCALLS,
    run: park,
};

pub static DEDUP: TileDescriptor = TileDescriptor {
    name: "dedup",
    in_wksp: Some("verify_dedup"),
    out_wksp: Some("dedup_pack"),
    extra_wksp: None,
    init: Some(announce),
    allow_fds: stderr_and_log,
    allow_syscalls: PARKED_SYSCALLS,
    run: park,
};

pub static PACK: TileDescriptor = TileDescriptor {
    name: "pack",
    in_wksp: Some("dedup_pack"),
    out_wksp: Some("pack_forward"),
    extra_wksp: None,
    init: Some(announce),
    allow_fds: stderr_and_log,
    allow_syscalls: PARKED_SYSCALLS,
    run: park,
};

pub static FORWARD: TileDescriptor = TileDescriptor {
    name: "forward",
    in_wksp: Some("pack_forward"),
    out_wksp: None,
    extra_wksp: None,
    init: Some(announce),
    allow_fds: stderr_and_log,
    allow_syscalls: PARKED_SYSCALLS,
    run: park,
};

pub static BUILTIN: PipelineRoles = PipelineRoles {
    ingest: &QUIC,
    verify: &VERIFY,
    dedup: &DEDUP,
    pack: &PACK,
    forward: &FORWARD,
};

/// Look up a built-in descriptor by role name
pub fn by_name(name: &str) -> Option<&'static TileDescriptor> {
    [&QUIC, &VERIFY, &DEDUP, &PACK, &FORWARD]
        .into_iter()
        .find(|desc| desc.name == name)
}

fn announce(ctx: &mut TileContext) -> Result<()> {
    info!(
        "{}({}) attached {} ({} bytes), pid {}",
        ctx.name,
        ctx.replica,
        ctx.workspace.name(),
        ctx.workspace.len(),
        ctx.pid
    );
    Ok(())
}

fn park(_: &TileContext) -> Result<()> {
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}
