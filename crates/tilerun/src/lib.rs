//! tilerun: fail-fast supervision of CPU-pinned, sandboxed tile processes
//!
//! A run boots a fixed topology of tiles (ingest, verify, dedup, pack,
//! forward), one process each, under a private PID namespace. The first tile
//! to leave, for any reason, takes the whole group down and its status
//! becomes the exit code of the top-level process.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilerun::{
//!     DirWorkspaces, NamespaceSupervisor, ProcessSupervisor, SupervisorSettings, TileRunConfig,
//!     Topology, tiles,
//! };
//!
//! # fn main() -> tilerun::Result<()> {
//! let config = TileRunConfig::default();
//! let topology = Topology::pipeline(
//!     &tiles::BUILTIN,
//!     config.layout.ingest_tile_count,
//!     config.layout.verify_tile_count,
//! )?;
//! let settings = SupervisorSettings::from_config(&config, None);
//! let workspaces = Arc::new(DirWorkspaces::new(&config.workspace.directory));
//! let leader = NamespaceSupervisor::new(settings, topology, workspaces)?;
//! ProcessSupervisor::new(leader).run()
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod execution;
pub mod preflight;
pub mod signals;
pub mod supervisor;
pub mod tile;
pub mod tiles;
pub mod topology;
pub mod workspace;

pub use config::TileRunConfig;
pub use supervisor::{NamespaceSupervisor, ProcessSupervisor, SupervisorSettings};
pub use tile::{TileArgs, TileContext, TileDescriptor};
pub use tilerun_core::{Result, TileError};
pub use topology::{PipelineRoles, Slot, Topology};
pub use workspace::{DirWorkspaces, Workspace, WorkspaceProvider};
