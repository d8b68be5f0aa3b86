//! Sequential, CPU-pinned tile spawning

use crate::execution::entry;
use crate::supervisor::SupervisorSettings;
use crate::tile::{TileArgs, TileDescriptor};
use crate::workspace::WorkspaceProvider;
use log::{info, warn};
use nix::sched::CpuSet;
use nix::unistd::Pid;
use std::sync::Arc;
use tilerun_core::Result;
use tilerun_namespace::{Isolation, ProcessNamespace};
use tilerun_resources::{AffinityTable, affinity};

/// Spawns tiles one at a time, in topology order.
///
/// Before each spawn the calling thread is moved onto the tile's CPU so the
/// child's stack is first touched, and therefore allocated, on that CPU's
/// NUMA node. The caller restores [`TileSpawner::floating`] once done.
pub struct TileSpawner {
    app_name: String,
    affinity: AffinityTable,
    floating: CpuSet,
    sandbox: bool,
    uid: u32,
    gid: u32,
    tick_per_ns: f64,
    log_fd: Option<std::os::fd::RawFd>,
    workspaces: Arc<dyn WorkspaceProvider>,
    namespace: ProcessNamespace,
}

impl TileSpawner {
    pub fn new(
        settings: &SupervisorSettings,
        affinity: AffinityTable,
        floating: CpuSet,
        tick_per_ns: f64,
        workspaces: Arc<dyn WorkspaceProvider>,
    ) -> Self {
        Self {
            app_name: settings.app_name.clone(),
            affinity,
            floating,
            sandbox: settings.sandbox,
            uid: settings.uid,
            gid: settings.gid,
            tick_per_ns,
            log_fd: settings.log_fd,
            workspaces,
            namespace: ProcessNamespace::new(Isolation::from_sandbox(settings.sandbox)),
        }
    }

    /// Mask saved before the first spawn
    pub fn floating(&self) -> &CpuSet {
        &self.floating
    }

    pub fn namespace(&self) -> &ProcessNamespace {
        &self.namespace
    }

    pub fn into_namespace(self) -> ProcessNamespace {
        self.namespace
    }

    /// Spawn the next tile; its ordinal is the number spawned so far.
    ///
    /// A pinning failure is only a warning. Stack or process creation
    /// failures are returned and are fatal to the group.
    pub fn spawn(&mut self, descriptor: &'static TileDescriptor, replica: usize) -> Result<Pid> {
        let ordinal = self.namespace.children().len();
        let slot = self.affinity.slot(ordinal);

        if let Err(e) = self
            .affinity
            .mask_for(ordinal, &self.floating)
            .and_then(|mask| affinity::apply(&mask))
        {
            warn!(
                "unable to pin {}({}) to cpu {}, it may run on any cpu: {}",
                descriptor.name, replica, slot, e
            );
        }

        info!("booting tile {}({}) on cpu {}", descriptor.name, replica, slot);

        let args = TileArgs {
            app_name: self.app_name.clone(),
            replica,
            ordinal,
            descriptor,
            sandbox: self.sandbox,
            uid: self.uid,
            gid: self.gid,
            tick_per_ns: self.tick_per_ns,
            log_fd: self.log_fd,
            workspaces: Arc::clone(&self.workspaces),
        };
        self.namespace
            .spawn(descriptor.name, move || entry::tile_main(args))
    }
}
