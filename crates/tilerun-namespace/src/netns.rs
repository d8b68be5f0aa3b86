//! Named network namespaces

use log::info;
use nix::sched::{CloneFlags, setns};
use std::fs::File;
use std::path::PathBuf;
use tilerun_core::{Result, TileError};

/// Directory where `ip netns add` creates named namespaces
pub const NETNS_DIR: &str = "/var/run/netns";

pub fn netns_path(interface: &str) -> PathBuf {
    PathBuf::from(NETNS_DIR).join(interface)
}

/// Move the calling thread into the named network namespace.
///
/// Children spawned afterwards start inside it. Requires CAP_SYS_ADMIN.
pub fn enter_network_namespace(interface: &str) -> Result<()> {
    let path = netns_path(interface);
    let file = File::open(&path).map_err(|e| {
        TileError::Namespace(format!(
            "failed to open network namespace {}: {}",
            path.display(),
            e
        ))
    })?;

    setns(&file, CloneFlags::CLONE_NEWNET).map_err(|e| {
        TileError::Namespace(format!(
            "setns({}) failed: {}",
            path.display(),
            e
        ))
    })?;

    info!("entered network namespace {}", interface);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_under_netns_dir() {
        assert_eq!(
            netns_path("veth_test_xdp_0"),
            PathBuf::from("/var/run/netns/veth_test_xdp_0")
        );
    }

    #[test]
    fn missing_namespace_is_a_namespace_error() {
        let err = enter_network_namespace("tilerun-does-not-exist").unwrap_err();
        assert!(matches!(err, TileError::Namespace(_)));
    }
}
