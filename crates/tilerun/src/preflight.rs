//! Permissions a run needs before anything is spawned

use crate::supervisor::SupervisorSettings;
use tilerun_core::{Capability, util};
use tilerun_resources::{Preflight, Resource};

/// Open descriptors the supervisor and tiles need while booting
pub const MIN_OPEN_FILES: u64 = 1024;

/// Collect every requirement of a run with these settings
pub fn check(settings: &SupervisorSettings) -> Preflight {
    let mut preflight = Preflight::new(&settings.app_name);

    if settings.sandbox {
        preflight.require_capability(
            Capability::SysAdmin,
            "create a PID namespace for the tiles (or disable [development] sandbox)",
        );
    }
    if settings.uid != util::get_uid() {
        preflight.require_capability(Capability::SetUid, "switch tiles to the configured uid");
    }
    if settings.gid != util::get_gid() {
        preflight.require_capability(Capability::SetGid, "switch tiles to the configured gid");
    }
    if settings.network_namespace.is_some() {
        preflight.require_capability(Capability::SysAdmin, "enter the network namespace");
    }
    preflight.require_resource_limit(
        Resource::RLIMIT_NOFILE,
        MIN_OPEN_FILES,
        "attach workspaces while booting tiles",
    );

    preflight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileRunConfig;

    #[test]
    fn unsandboxed_run_as_self_needs_no_capabilities() {
        let mut config = TileRunConfig::default();
        config.development.sandbox = false;
        let settings = SupervisorSettings::from_config(&config, None);

        let preflight = check(&settings);
        assert!(
            preflight
                .failures()
                .iter()
                .all(|f| !f.contains("CAP_")),
            "{}",
            preflight.report()
        );
    }

    #[test]
    fn sandboxed_run_requires_sys_admin() {
        let settings = SupervisorSettings::from_config(&TileRunConfig::default(), None);
        let preflight = check(&settings);
        let report = preflight.report();
        assert!(report.contains("CAP_SYS_ADMIN"), "{}", report);
    }

    #[test]
    fn foreign_uid_requires_setuid() {
        let mut config = TileRunConfig::default();
        config.uid = util::get_uid().wrapping_add(1);
        let settings = SupervisorSettings::from_config(&config, None);
        assert!(check(&settings).report().contains("CAP_SETUID"));
    }
}
