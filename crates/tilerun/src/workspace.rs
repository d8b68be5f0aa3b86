//! Shared-memory workspaces
//!
//! Workspaces are created and laid out by an external tool; tiles only
//! attach to them by name and read the root object. The provided
//! [`DirWorkspaces`] maps files from a directory such as `/dev/shm`.

use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tilerun_core::{Result, TileError};

/// Name of the workspace private to one tile replica
pub fn private_name(app: &str, tile: &str, replica: usize) -> String {
    format!("{}_{}{}.wksp", app, tile, replica)
}

/// Name of a workspace shared between tiles
pub fn shared_name(app: &str, wksp: &str) -> String {
    format!("{}_{}0.wksp", app, wksp)
}

/// Source of workspace mappings
pub trait WorkspaceProvider: Send + Sync {
    fn attach(&self, name: &str) -> Result<Workspace>;
}

/// A mapped workspace. Unmapped on drop.
pub struct Workspace {
    name: String,
    base: NonNull<u8>,
    len: usize,
}

impl Workspace {
    /// Map the whole of `file` shared and writable.
    ///
    /// The mapping outlives the descriptor, so `file` may be closed after.
    pub fn map_file(name: &str, file: &File) -> Result<Self> {
        let len = file.metadata()?.len() as usize;
        let length = NonZeroUsize::new(len)
            .ok_or_else(|| TileError::Workspace(format!("workspace {} is empty", name)))?;

        // SAFETY: fresh shared mapping of a valid descriptor, nothing aliases it yet
        let base = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file,
                0,
            )
        }
        .map_err(|e| TileError::Workspace(format!("mmap of {} failed: {}", name, e)))?
        .cast::<u8>();

        Ok(Self {
            name: name.to_string(),
            base,
            len,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Root object of the workspace
    pub fn pod(&self) -> &[u8] {
        // SAFETY: base..base+len is mapped for the lifetime of self
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    pub fn pod_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self gives exclusive access in-process
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // SAFETY: unmapping exactly the region created in map_file
        let _ = unsafe { munmap(self.base.cast(), self.len) };
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("name", &self.name)
            .field("len", &self.len)
            .finish()
    }
}

/// Workspaces stored as files in one directory
#[derive(Debug, Clone)]
pub struct DirWorkspaces {
    dir: PathBuf,
}

impl DirWorkspaces {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Create (or resize) a zero-filled workspace file
    pub fn create(&self, name: &str, len: u64) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.path(name))?;
        file.set_len(len)?;
        Ok(())
    }
}

impl WorkspaceProvider for DirWorkspaces {
    fn attach(&self, name: &str) -> Result<Workspace> {
        let path = self.path(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                TileError::Workspace(format!("failed to attach {}: {}", path.display(), e))
            })?;
        Workspace::map_file(name, &file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_scheme() {
        assert_eq!(private_name("fd", "verify", 2), "fd_verify2.wksp");
        assert_eq!(shared_name("fd", "quic_verify"), "fd_quic_verify0.wksp");
    }

    #[test]
    fn attach_maps_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirWorkspaces::new(dir.path());
        provider.create("app_pack0.wksp", 4096).unwrap();

        let mut wksp = provider.attach("app_pack0.wksp").unwrap();
        assert_eq!(wksp.len(), 4096);
        assert!(wksp.pod().iter().all(|&b| b == 0));

        wksp.pod_mut()[0] = 7;
        let again = provider.attach("app_pack0.wksp").unwrap();
        assert_eq!(again.pod()[0], 7);
    }

    #[test]
    fn attach_missing_workspace_fails() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirWorkspaces::new(dir.path());
        let err = provider.attach("missing.wksp").unwrap_err();
        assert!(matches!(err, TileError::Workspace(_)));
    }

    #[test]
    fn attach_empty_workspace_fails() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirWorkspaces::new(dir.path());
        provider.create("empty.wksp", 0).unwrap();
        let err = provider.attach("empty.wksp").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
