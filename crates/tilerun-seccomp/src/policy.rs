//! Sandbox policy value object

use crate::bpf::SeccompBpf;
use crate::{fds, privilege};
use log::debug;
use std::collections::BTreeSet;
use std::os::fd::RawFd;
use tilerun_core::Result;
use tilerun_resources::rlimit;

/// What a process keeps once it enters the sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPolicy {
    uid: u32,
    gid: u32,
    syscalls: BTreeSet<i64>,
    fds: BTreeSet<RawFd>,
}

impl SandboxPolicy {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            gid,
            syscalls: BTreeSet::new(),
            fds: BTreeSet::new(),
        }
    }

    pub fn allow_syscalls(mut self, syscalls: &[i64]) -> Self {
        self.syscalls.extend(syscalls.iter().copied());
        self
    }

    pub fn allow_fds(mut self, fds: &[RawFd]) -> Self {
        self.fds.extend(fds.iter().copied());
        self
    }

    pub fn syscalls(&self) -> &BTreeSet<i64> {
        &self.syscalls
    }

    pub fn fds(&self) -> &BTreeSet<RawFd> {
        &self.fds
    }

    /// Enter the sandbox. Consumes the policy; there is no way back.
    ///
    /// With `enabled` false only the uid/gid switch happens, which keeps
    /// development runs debuggable while still exercising privilege drop.
    ///
    /// Order of operations:
    /// 1. Compile the filter (needs allocation, nothing irreversible yet)
    /// 2. Close every descriptor not in the allow-list
    /// 3. Drop to uid/gid
    /// 4. Forbid new descriptors
    /// 5. Load the seccomp filter
    pub fn apply(self, enabled: bool) -> Result<()> {
        if !enabled {
            debug!("sandbox disabled, switching ids only");
            return privilege::drop_privileges(self.uid, self.gid);
        }

        let program = SeccompBpf::compile(&self.syscalls)?;
        fds::restrict_descriptors(&self.fds)?;
        privilege::drop_privileges(self.uid, self.gid)?;
        rlimit::forbid_new_descriptors()?;

        debug!(
            "entering sandbox: {} syscalls, fds {:?}",
            self.syscalls.len(),
            self.fds
        );
        SeccompBpf::load(&program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_without_duplicates() {
        let policy = SandboxPolicy::new(1000, 1000)
            .allow_syscalls(&[libc::SYS_write, libc::SYS_wait4])
            .allow_syscalls(&[libc::SYS_write])
            .allow_fds(&[2, 3])
            .allow_fds(&[2]);
        assert_eq!(policy.syscalls().len(), 2);
        assert_eq!(policy.fds().iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    }
}
