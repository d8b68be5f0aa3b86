//! PID namespace leader

use crate::clock;
use crate::execution::TileSpawner;
use crate::signals;
use crate::supervisor::SupervisorSettings;
use crate::topology::Topology;
use crate::workspace::WorkspaceProvider;
use log::{error, info};
use nix::sys::signal::Signal;
use nix::unistd::{Pid, setpgid};
use std::convert::Infallible;
use std::sync::Arc;
use tilerun_core::{Result, TileError, identity, util};
use tilerun_namespace::{Isolation, ProcessNamespace, netns};
use tilerun_resources::{AffinityTable, affinity};
use tilerun_seccomp::SandboxPolicy;

/// Init of the tile group.
///
/// Construction validates the affinity table against the topology, so a
/// table that is too short fails before any process is created.
pub struct NamespaceSupervisor {
    settings: SupervisorSettings,
    topology: Topology,
    affinity: AffinityTable,
    workspaces: Arc<dyn WorkspaceProvider>,
}

impl NamespaceSupervisor {
    pub fn new(
        settings: SupervisorSettings,
        topology: Topology,
        workspaces: Arc<dyn WorkspaceProvider>,
    ) -> Result<Self> {
        let affinity = AffinityTable::parse(&settings.affinity)?;
        affinity.ensure_covers(topology.required_tiles())?;
        Ok(Self {
            settings,
            topology,
            affinity,
            workspaces,
        })
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn affinity(&self) -> &AffinityTable {
        &self.affinity
    }

    /// Boot every tile, then wait for the first one to leave and exit with
    /// a status derived from it. Never returns.
    pub fn run(self) -> ! {
        match self.supervise() {
            Ok(never) => match never {},
            Err(e) => {
                error!("namespace leader failed: {}", e);
                util::exit_group(e.exit_code())
            }
        }
    }

    /// Returns only for failures before the sandbox is entered; afterwards
    /// the leader exits in place so nothing is freed under the filter.
    fn supervise(self) -> Result<Infallible> {
        identity::set(identity::SUPERVISOR_ORDINAL, "pidns");
        signals::reset_to_default()?;
        // Keep terminal interrupts on the top-level process only
        setpgid(Pid::from_raw(0), Pid::from_raw(0))
            .map_err(|e| TileError::Syscall(format!("setpgid failed: {}", e)))?;

        let tick_per_ns = clock::calibrate();
        let floating = affinity::current()?;

        if let Some(interface) = &self.settings.network_namespace {
            netns::enter_network_namespace(interface)?;
        }

        let mut spawner = TileSpawner::new(
            &self.settings,
            self.affinity,
            floating,
            tick_per_ns,
            self.workspaces,
        );
        if let Err(e) = boot_tiles(&mut spawner, &self.topology) {
            spawner.namespace().kill_all(Signal::SIGKILL);
            return Err(e);
        }
        let namespace = spawner.into_namespace();
        info!("booted {} tiles", namespace.children().len());

        let mut syscalls = vec![libc::SYS_write, libc::SYS_wait4, libc::SYS_exit_group];
        if namespace.isolation() == Isolation::ProcessGroup {
            syscalls.push(libc::SYS_kill);
        }
        let policy = SandboxPolicy::new(self.settings.uid, self.settings.gid)
            .allow_syscalls(&syscalls)
            .allow_fds(&self.settings.kept_fds());
        drop(syscalls);
        if let Err(e) = policy.apply(self.settings.sandbox) {
            namespace.kill_all(Signal::SIGKILL);
            return Err(e);
        }

        util::exit_group(supervise_tiles(&namespace))
    }
}

fn boot_tiles(spawner: &mut TileSpawner, topology: &Topology) -> Result<()> {
    for slot in topology.slots() {
        spawner.spawn(slot.descriptor, slot.replica)?;
    }
    affinity::apply(spawner.floating())
}

/// Ordinal reported for a reaped process that is not a tile
pub const UNKNOWN_ORDINAL: usize = usize::MAX;

/// Wait for the first child to leave and report it.
///
/// Runs sandboxed: nothing here may allocate or open files.
fn supervise_tiles(namespace: &ProcessNamespace) -> i32 {
    let (pid, termination) = match namespace.wait_any() {
        Ok(reaped) => reaped,
        Err(e) => {
            util::write_stderr(format_args!("error waiting for tiles: {}\n", e));
            namespace.kill_all(Signal::SIGKILL);
            return 1;
        }
    };

    // Any descendant reaped by this init ends the group, tile or not
    let (ordinal, name) = match namespace.find(pid) {
        Some((ordinal, child)) => (ordinal, child.name.as_str()),
        None => (UNKNOWN_ORDINAL, "unknown"),
    };

    util::write_stderr(format_args!("tile {} ({}) {}\n", ordinal, name, termination));
    namespace.kill_all(Signal::SIGKILL);
    termination.group_exit_code()
}
