//! Spawning and reaping a group of child processes

use crate::termination::Termination;
use log::{debug, warn};
use nix::errno::Errno;
use nix::sched::{CloneFlags, clone};
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use tilerun_core::{Result, TileError};

/// Stack reserved for each child
pub const STACK_SIZE: usize = 8 << 20;

/// How members of the group are isolated from the rest of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    /// Children share a new PID namespace; each clone creates one
    PidNamespace,
    /// Children stay in the caller's PID namespace and process group
    ProcessGroup,
}

impl Isolation {
    pub fn from_sandbox(sandbox: bool) -> Self {
        if sandbox {
            Isolation::PidNamespace
        } else {
            Isolation::ProcessGroup
        }
    }

    fn clone_flags(self) -> CloneFlags {
        match self {
            Isolation::PidNamespace => CloneFlags::CLONE_NEWPID,
            Isolation::ProcessGroup => CloneFlags::empty(),
        }
    }
}

/// A spawned member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub pid: Pid,
    pub name: String,
}

/// Children spawned by this process, in spawn order
#[derive(Debug)]
pub struct ProcessNamespace {
    isolation: Isolation,
    children: Vec<Child>,
}

impl ProcessNamespace {
    pub fn new(isolation: Isolation) -> Self {
        Self {
            isolation,
            children: Vec::new(),
        }
    }

    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Spawn ordinal and record for a pid
    pub fn find(&self, pid: Pid) -> Option<(usize, &Child)> {
        self.children
            .iter()
            .enumerate()
            .find(|(_, child)| child.pid == pid)
    }

    /// Create a child running `entry` on a fresh stack.
    ///
    /// The child starts with a copy of the caller's address space and never
    /// returns into it; `entry` should end the process itself. Any value it
    /// does return becomes the exit status.
    pub fn spawn<F>(&mut self, name: &str, entry: F) -> Result<Pid>
    where
        F: FnOnce() -> isize,
    {
        let mut stack: Vec<u8> = Vec::new();
        stack.try_reserve_exact(STACK_SIZE).map_err(|e| {
            TileError::Resource(format!(
                "failed to allocate {} byte stack for {}: {}",
                STACK_SIZE, name, e
            ))
        })?;
        stack.resize(STACK_SIZE, 0);

        let mut entry = Some(entry);
        let callback = Box::new(move || match entry.take() {
            Some(entry) => entry(),
            None => 1,
        });

        let pid = unsafe {
            clone(
                callback,
                &mut stack,
                self.isolation.clone_flags(),
                Some(Signal::SIGCHLD as i32),
            )
        }
        .map_err(|e| TileError::Resource(format!("clone failed for {}: {}", name, e)))?;

        debug!("spawned {} as pid {}", name, pid);
        self.children.push(Child {
            pid,
            name: name.to_string(),
        });
        Ok(pid)
    }

    /// Block until any child terminates.
    ///
    /// Stops and continues are skipped; interrupted waits are retried.
    pub fn wait_any(&self) -> Result<(Pid, Termination)> {
        loop {
            match waitpid(Pid::from_raw(-1), None) {
                Ok(status) => {
                    if let (Some(pid), Some(termination)) =
                        (status.pid(), Termination::from_wait_status(status))
                    {
                        return Ok((pid, termination));
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(TileError::Syscall(format!("wait4 failed: {}", e))),
            }
        }
    }

    /// Block until a specific child terminates
    pub fn wait_for(&self, pid: Pid) -> Result<Termination> {
        loop {
            match waitpid(pid, None) {
                Ok(status) => {
                    if let Some(termination) = Termination::from_wait_status(status) {
                        return Ok(termination);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(TileError::Syscall(format!("wait4 failed: {}", e))),
            }
        }
    }

    /// Deliver `signal` to every recorded child.
    ///
    /// PID namespace members are torn down by the kernel when the namespace
    /// init exits, so only process groups need this.
    pub fn kill_all(&self, signal: Signal) {
        if self.isolation == Isolation::PidNamespace {
            return;
        }
        for child in &self.children {
            match kill(child.pid, signal) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!("failed to signal {} ({}): {}", child.name, child.pid, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation_follows_sandbox_flag() {
        assert_eq!(Isolation::from_sandbox(true), Isolation::PidNamespace);
        assert_eq!(Isolation::from_sandbox(false), Isolation::ProcessGroup);
        assert!(
            Isolation::PidNamespace
                .clone_flags()
                .contains(CloneFlags::CLONE_NEWPID)
        );
        assert!(Isolation::ProcessGroup.clone_flags().is_empty());
    }

    #[test]
    fn find_reports_spawn_ordinal() {
        let mut ns = ProcessNamespace::new(Isolation::ProcessGroup);
        ns.children.push(Child {
            pid: Pid::from_raw(100),
            name: "quic".into(),
        });
        ns.children.push(Child {
            pid: Pid::from_raw(200),
            name: "verify".into(),
        });
        let (ordinal, child) = ns.find(Pid::from_raw(200)).unwrap();
        assert_eq!(ordinal, 1);
        assert_eq!(child.name, "verify");
        assert!(ns.find(Pid::from_raw(300)).is_none());
    }
}
