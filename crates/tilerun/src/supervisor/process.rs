//! Top-level supervisor

use crate::signals;
use crate::supervisor::NamespaceSupervisor;
use log::{error, info};
use std::convert::Infallible;
use tilerun_core::{Result, identity, util};
use tilerun_namespace::{Isolation, ProcessNamespace};
use tilerun_seccomp::SandboxPolicy;

/// Owns the operator-facing process: starts the namespace leader and turns
/// its fate into the final exit code.
pub struct ProcessSupervisor {
    leader: NamespaceSupervisor,
}

impl ProcessSupervisor {
    pub fn new(leader: NamespaceSupervisor) -> Self {
        Self { leader }
    }

    /// Run until the tile group ends. Never returns.
    ///
    /// Exit status: 0 after an operator SIGTERM/SIGINT, otherwise the
    /// leader's status (a tile's signal number or non-zero exit code, else 1).
    pub fn run(self) -> ! {
        match self.supervise() {
            Ok(never) => match never {},
            Err(e) => {
                error!("{}", e);
                signals::write_log_location();
                util::exit_group(1)
            }
        }
    }

    /// Returns only for failures before the sandbox is entered
    fn supervise(self) -> Result<Infallible> {
        let settings = self.leader.settings().clone();
        let sandbox = settings.sandbox;
        identity::set(identity::SUPERVISOR_ORDINAL, "main");

        // Handlers first: a signal arriving after the clone must find them
        signals::set_log_path(settings.log_path.as_deref());
        signals::install_operator_handlers()?;

        // SAFETY: stdin/stdout are unused from here on
        unsafe {
            libc::close(libc::STDIN_FILENO);
            libc::close(libc::STDOUT_FILENO);
        }

        let mut namespace = ProcessNamespace::new(Isolation::from_sandbox(sandbox));
        let leader = self.leader;
        let pid = namespace.spawn("pidns", move || leader.run())?;
        signals::set_leader(pid);
        info!("namespace leader is pid {}", pid);

        let policy = SandboxPolicy::new(settings.uid, settings.gid)
            .allow_syscalls(&[
                libc::SYS_write,
                libc::SYS_wait4,
                libc::SYS_kill,
                libc::SYS_exit_group,
            ])
            .allow_fds(&settings.kept_fds());
        drop(settings);
        if let Err(e) = policy.apply(sandbox) {
            // Without a PID namespace the leader's tiles outlive it
            signals::kill_leader_group(pid);
            return Err(e);
        }

        let code = match namespace.wait_for(pid) {
            Ok(termination) => termination.group_exit_code(),
            Err(_) => {
                util::write_stderr_bytes(b"error waiting for child process to exit\n");
                signals::write_log_location();
                1
            }
        };
        util::exit_group(code)
    }
}
