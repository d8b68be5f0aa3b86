//! Runtime detection of privileges and kernel features
//!
//! Probes the running kernel to report which supervision features can be
//! used, and reads the effective capability set for pre-flight checks.

use std::path::Path;

/// Linux capabilities the supervisor may need before it drops privileges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// CAP_SETGID (6)
    SetGid,
    /// CAP_SETUID (7)
    SetUid,
    /// CAP_SYS_ADMIN (21)
    SysAdmin,
    /// CAP_SYS_RESOURCE (24)
    SysResource,
}

impl Capability {
    /// Bit index in the kernel capability mask
    pub fn bit(self) -> u32 {
        match self {
            Capability::SetGid => 6,
            Capability::SetUid => 7,
            Capability::SysAdmin => 21,
            Capability::SysResource => 24,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Capability::SetGid => "CAP_SETGID",
            Capability::SetUid => "CAP_SETUID",
            Capability::SysAdmin => "CAP_SYS_ADMIN",
            Capability::SysResource => "CAP_SYS_RESOURCE",
        }
    }

    /// Whether the calling process holds this capability in its effective set
    pub fn is_effective(self) -> bool {
        effective_mask().is_some_and(|mask| mask & (1u64 << self.bit()) != 0)
    }
}

/// Effective capability mask from the `CapEff` line of `/proc/self/status`
pub fn effective_mask() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_cap_eff(&status)
}

fn parse_cap_eff(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("CapEff:"))
        .and_then(|hex| u64::from_str_radix(hex.trim(), 16).ok())
}

/// Detected system capabilities for tile supervision
#[derive(Debug, Clone)]
pub struct SystemCapabilities {
    /// Running as root (euid == 0)
    pub has_root: bool,
    /// CAP_SYS_ADMIN is effective, so PID and network namespaces can be created
    pub has_sys_admin: bool,
    /// PID namespaces are compiled into the kernel
    pub has_pid_namespaces: bool,
    /// Seccomp BPF filtering is available
    pub has_seccomp: bool,
    /// Named network namespaces exist under /var/run/netns
    pub has_named_netns: bool,
    /// CPUs in the calling thread's affinity mask
    pub cpu_count: usize,
}

impl SystemCapabilities {
    /// Detect all available capabilities on the current system
    pub fn detect() -> Self {
        Self {
            has_root: crate::util::is_root(),
            has_sys_admin: Capability::SysAdmin.is_effective(),
            has_pid_namespaces: Path::new("/proc/self/ns/pid").exists(),
            has_seccomp: detect_seccomp(),
            has_named_netns: Path::new("/var/run/netns").is_dir(),
            cpu_count: detect_cpu_count(),
        }
    }

    /// Whether a fully sandboxed run is possible on this host
    pub fn can_sandbox(&self) -> bool {
        self.has_sys_admin && self.has_pid_namespaces && self.has_seccomp
    }

    /// Get a human-readable summary of capabilities
    pub fn summary(&self) -> String {
        let check = |available: bool| if available { "[ok]" } else { "[--]" };

        [
            format!("{} Root privileges", check(self.has_root)),
            format!("{} CAP_SYS_ADMIN", check(self.has_sys_admin)),
            format!("{} PID namespaces", check(self.has_pid_namespaces)),
            format!("{} Seccomp BPF", check(self.has_seccomp)),
            format!("{} Named network namespaces", check(self.has_named_netns)),
            format!("[{:>2}] CPUs available", self.cpu_count),
        ]
        .join("\n")
    }
}

fn detect_seccomp() -> bool {
    // Returns 0 when seccomp is built in but inactive, -1/EINVAL when missing
    let ret = unsafe { libc::prctl(libc::PR_GET_SECCOMP, 0, 0, 0, 0) };
    ret >= 0
}

fn detect_cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_produces_output() {
        let caps = SystemCapabilities::detect();
        let summary = caps.summary();
        assert!(summary.contains("Root privileges"));
        assert!(summary.contains("PID namespaces"));
        assert!(summary.contains("CPUs available"));
    }

    #[test]
    fn detect_counts_at_least_one_cpu() {
        assert!(SystemCapabilities::detect().cpu_count >= 1);
    }

    #[test]
    fn parses_cap_eff_line() {
        let status = "Name:\tcat\nCapInh:\t0000000000000000\nCapEff:\t0000000000200000\n";
        let mask = parse_cap_eff(status).unwrap();
        assert_eq!(mask, 1 << Capability::SysAdmin.bit());
    }

    #[test]
    fn sandbox_needs_every_kernel_feature() {
        let mut caps = SystemCapabilities::detect();
        caps.has_sys_admin = true;
        caps.has_pid_namespaces = true;
        caps.has_seccomp = true;
        assert!(caps.can_sandbox());

        caps.has_seccomp = false;
        assert!(!caps.can_sandbox());
    }

    #[test]
    fn missing_cap_eff_is_none() {
        assert!(parse_cap_eff("Name:\tcat\n").is_none());
    }

    #[test]
    fn root_usually_holds_sys_admin() {
        // Containers may strip capabilities from root, so only check the converse.
        if Capability::SysAdmin.is_effective() {
            assert!(effective_mask().is_some());
        }
    }
}
