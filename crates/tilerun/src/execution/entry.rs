//! First code run inside a tile process

use crate::signals;
use crate::tile::{MAX_ALLOWED_FDS, TileArgs, TileContext};
use crate::workspace::{private_name, shared_name};
use log::debug;
use std::convert::Infallible;
use tilerun_core::{Result, TileError, identity, util};
use tilerun_seccomp::SandboxPolicy;

/// Boot a tile and run it. Never returns.
///
/// Exit status: 0 when the run hook returns `Ok` or the tile is asked to
/// shut down, the requested code for `ProcessExit`, 1 for any other error.
pub fn tile_main(args: TileArgs) -> ! {
    let name = args.descriptor.name;
    let ordinal = args.ordinal;

    match boot(args) {
        Ok(never) => match never {},
        Err(e) => util::exit_group(exit_code(ordinal, name, Err(e))),
    }
}

/// Status for a finished tile, reporting unexpected errors on stderr.
///
/// Called inside the sandbox: writes through a stack buffer only.
fn exit_code(ordinal: usize, name: &str, result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(TileError::ProcessExit { code }) => code,
        Err(e) => {
            util::write_stderr(format_args!("tile {} ({}) failed: {}\n", ordinal, name, e));
            e.exit_code()
        }
    }
}

/// Order of operations, each a precondition of the next:
/// 1. Identity and thread name
/// 2. Shutdown signal handlers
/// 3. Real pid
/// 4. Workspaces (private, then in/out/extra)
/// 5. Init hook
/// 6. Descriptor allow-list
/// 7. Sandbox (irreversible)
/// 8. Run hook, then exit
///
/// Only errors raised before the run hook are returned. Once sandboxed the
/// tile exits from here, with `ctx` still alive: dropping its workspaces
/// would call `munmap`, which the filter forbids.
fn boot(args: TileArgs) -> Result<Infallible> {
    let TileArgs {
        app_name,
        replica,
        ordinal,
        descriptor,
        sandbox,
        uid,
        gid,
        tick_per_ns,
        log_fd,
        workspaces,
    } = args;

    identity::set(ordinal, descriptor.name);
    signals::install_tile_handlers()?;
    let pid = util::getpid1()?;

    let workspace = workspaces.attach(&private_name(&app_name, descriptor.name, replica))?;
    let attach_shared = |wksp: Option<&str>| {
        wksp.map(|wksp| workspaces.attach(&shared_name(&app_name, wksp)))
            .transpose()
    };
    let in_workspace = attach_shared(descriptor.in_wksp)?;
    let out_workspace = attach_shared(descriptor.out_wksp)?;
    let extra_workspace = attach_shared(descriptor.extra_wksp)?;
    drop(workspaces);

    let mut ctx = TileContext {
        app_name,
        name: descriptor.name,
        replica,
        ordinal,
        pid,
        tick_per_ns,
        log_fd,
        workspace,
        in_workspace,
        out_workspace,
        extra_workspace,
    };

    if let Some(init) = descriptor.init {
        init(&mut ctx)?;
    }

    let fds = (descriptor.allow_fds)(&ctx, MAX_ALLOWED_FDS);
    if fds.len() > MAX_ALLOWED_FDS {
        return Err(TileError::Configuration(format!(
            "{} allows {} file descriptors, at most {} are supported",
            descriptor.name,
            fds.len(),
            MAX_ALLOWED_FDS
        )));
    }

    debug!(
        "{}({}) entering sandbox as pid {} with fds {:?}",
        descriptor.name, replica, pid, fds
    );
    let policy = SandboxPolicy::new(uid, gid)
        .allow_fds(&fds)
        .allow_syscalls(descriptor.allow_syscalls);
    drop(fds);
    policy.apply(sandbox)?;

    let result = (descriptor.run)(&ctx);
    util::exit_group(exit_code(ordinal, descriptor.name, result))
}
