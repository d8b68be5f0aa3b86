//! Seccomp BPF filter compilation and loading using seccompiler

use log::debug;
use seccompiler::{BpfProgram, SeccompAction, SeccompFilter, SeccompRule, TargetArch, apply_filter};
use std::collections::{BTreeMap, BTreeSet};
use std::convert::TryInto;
use tilerun_core::{Result, TileError};

/// Seccomp BPF filter compiler and loader
pub struct SeccompBpf;

impl SeccompBpf {
    /// Compile an allow-list of syscall numbers into a filter that kills the
    /// whole process on any other syscall.
    pub fn compile(syscalls: &BTreeSet<i64>) -> Result<BpfProgram> {
        if syscalls.is_empty() {
            return Err(TileError::Seccomp(
                "refusing to build a filter that allows no syscalls".to_string(),
            ));
        }

        let rules: BTreeMap<i64, Vec<SeccompRule>> =
            syscalls.iter().map(|&nr| (nr, Vec::new())).collect();

        let arch: TargetArch = std::env::consts::ARCH.try_into().map_err(|e| {
            TileError::Seccomp(format!(
                "unsupported architecture {}: {:?}",
                std::env::consts::ARCH,
                e
            ))
        })?;

        let filter = SeccompFilter::new(
            rules,
            SeccompAction::KillProcess,
            SeccompAction::Allow,
            arch,
        )
        .map_err(|e| TileError::Seccomp(format!("Failed to create filter: {}", e)))?;

        let program: BpfProgram = filter
            .try_into()
            .map_err(|e| TileError::Seccomp(format!("Failed to compile filter: {}", e)))?;

        debug!(
            "compiled seccomp filter: {} syscalls, {} instructions",
            syscalls.len(),
            program.len()
        );
        Ok(program)
    }

    /// Load a compiled program into the calling process.
    /// NOTE: This does NOT require root - only PR_SET_NO_NEW_PRIVS is needed.
    pub fn load(program: &BpfProgram) -> Result<()> {
        unsafe {
            if libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) != 0 {
                return Err(TileError::Seccomp(format!(
                    "Failed to set PR_SET_NO_NEW_PRIVS: {}",
                    std::io::Error::last_os_error()
                )));
            }
        }

        apply_filter(program)
            .map_err(|e| TileError::Seccomp(format!("Failed to apply seccomp filter: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_minimal_allow_list() {
        let syscalls = BTreeSet::from([libc::SYS_write, libc::SYS_exit_group]);
        let program = SeccompBpf::compile(&syscalls).unwrap();
        assert!(!program.is_empty());
    }

    #[test]
    fn larger_allow_list_grows_program() {
        let small = SeccompBpf::compile(&BTreeSet::from([libc::SYS_write])).unwrap();
        let large = SeccompBpf::compile(&BTreeSet::from([
            libc::SYS_write,
            libc::SYS_wait4,
            libc::SYS_kill,
            libc::SYS_exit_group,
        ]))
        .unwrap();
        assert!(large.len() > small.len());
    }

    #[test]
    fn rejects_empty_allow_list() {
        let err = SeccompBpf::compile(&BTreeSet::new()).unwrap_err();
        assert!(matches!(err, TileError::Seccomp(_)));
    }
}
