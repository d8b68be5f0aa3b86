//! getrlimit/setrlimit wrappers

pub use nix::sys::resource::Resource;
use nix::sys::resource::{getrlimit, setrlimit};
use tilerun_core::{Result, TileError};

/// Current (soft, hard) limits of a resource
pub fn get_rlimit(resource: Resource) -> Result<(u64, u64)> {
    getrlimit(resource)
        .map_err(|e| TileError::Syscall(format!("getrlimit({:?}) failed: {}", resource, e)))
}

/// Set both limits of a resource.
///
/// Lowering the hard limit cannot be undone without CAP_SYS_RESOURCE.
pub fn set_rlimit(resource: Resource, soft: u64, hard: u64) -> Result<()> {
    setrlimit(resource, soft, hard)
        .map_err(|e| TileError::Syscall(format!("setrlimit({:?}) failed: {}", resource, e)))
}

/// Forbid opening any new file descriptor.
///
/// Descriptors that are already open keep working.
pub fn forbid_new_descriptors() -> Result<()> {
    set_rlimit(Resource::RLIMIT_NOFILE, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nofile_soft_never_exceeds_hard() {
        let (soft, hard) = get_rlimit(Resource::RLIMIT_NOFILE).unwrap();
        assert!(soft <= hard);
    }

    #[test]
    fn setting_current_limits_is_a_noop() {
        let (soft, hard) = get_rlimit(Resource::RLIMIT_CORE).unwrap();
        set_rlimit(Resource::RLIMIT_CORE, soft, hard).unwrap();
        assert_eq!(get_rlimit(Resource::RLIMIT_CORE).unwrap(), (soft, hard));
    }
}
