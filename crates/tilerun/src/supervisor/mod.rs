//! The two supervision layers
//!
//! [`ProcessSupervisor`] is the top-level process. It spawns a
//! [`NamespaceSupervisor`], which acts as init for every tile. A tile leaving
//! ends the namespace leader, which ends the top-level process with the
//! tile's status.

pub mod namespace;
pub mod process;

pub use namespace::NamespaceSupervisor;
pub use process::ProcessSupervisor;

use crate::config::TileRunConfig;
use std::os::fd::RawFd;
use std::path::PathBuf;

/// Run-wide settings shared by both supervisors and the spawner
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorSettings {
    pub app_name: String,
    /// Affinity string, see [`tilerun_resources::affinity`]
    pub affinity: String,
    pub sandbox: bool,
    pub uid: u32,
    pub gid: u32,
    pub network_namespace: Option<String>,
    pub log_path: Option<PathBuf>,
    /// Open log file, kept through every sandbox
    pub log_fd: Option<RawFd>,
}

impl SupervisorSettings {
    pub fn from_config(config: &TileRunConfig, log_fd: Option<RawFd>) -> Self {
        Self {
            app_name: config.name.clone(),
            affinity: config.layout.affinity.clone(),
            sandbox: config.development.sandbox,
            uid: config.uid,
            gid: config.gid,
            network_namespace: config.network_namespace().map(str::to_string),
            log_path: config.log.path.clone(),
            log_fd,
        }
    }

    /// Descriptors a supervisor keeps once sandboxed: stderr and the log
    pub fn kept_fds(&self) -> Vec<RawFd> {
        let mut fds = vec![libc::STDERR_FILENO];
        fds.extend(self.log_fd);
        fds
    }
}
