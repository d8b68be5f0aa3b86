//! tilerun-seccomp: one-way process sandbox
//!
//! A [`SandboxPolicy`] bundles the syscalls and file descriptors a process
//! keeps, plus the uid/gid it runs as. Applying it closes every other
//! descriptor, drops privileges, forbids new descriptors and installs a
//! seccomp filter that kills the process on any other syscall.

pub mod bpf;
pub mod fds;
pub mod policy;
pub mod privilege;

pub use bpf::SeccompBpf;
pub use policy::SandboxPolicy;
