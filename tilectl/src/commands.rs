use console::style;
use log::info;
use serde::Serialize;
use std::os::fd::RawFd;
use std::path::Path;
use std::sync::Arc;
use tilerun::{
    DirWorkspaces, NamespaceSupervisor, ProcessSupervisor, SupervisorSettings, TileRunConfig,
    Topology, preflight, tiles, workspace,
};
use tilerun_core::{Result, SystemCapabilities};
use tilerun_resources::AffinityTable;

/// One row of `tilectl topology`
#[derive(Debug, Serialize, PartialEq)]
pub struct TopologyEntry {
    pub ordinal: usize,
    pub tile: &'static str,
    pub replica: usize,
    pub cpu: String,
    pub workspace: String,
}

pub fn load_config(path: Option<&Path>) -> Result<TileRunConfig> {
    match path {
        Some(path) => TileRunConfig::load(path),
        None => {
            let config = TileRunConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn build_topology(config: &TileRunConfig) -> Result<Topology> {
    Topology::pipeline(
        &tiles::BUILTIN,
        config.layout.ingest_tile_count,
        config.layout.verify_tile_count,
    )
}

/// Boot the pipeline and hand control to the supervisor. Only returns on
/// errors found before the first process is spawned.
pub fn run(config: &TileRunConfig, log_fd: Option<RawFd>) -> Result<()> {
    let settings = SupervisorSettings::from_config(config, log_fd);
    preflight::check(&settings).finish()?;

    let topology = build_topology(config)?;
    let workspaces = DirWorkspaces::new(&config.workspace.directory);
    if config.workspace.create_missing {
        for name in topology.workspace_names(&config.name) {
            if !workspaces.exists(&name) {
                info!("creating workspace {}", workspaces.path(&name).display());
                workspaces.create(&name, config.workspace.size)?;
            }
        }
    }

    info!(
        "booting {} tiles for {} (sandbox {})",
        topology.required_tiles(),
        config.name,
        if settings.sandbox { "on" } else { "off" }
    );
    let leader = NamespaceSupervisor::new(settings, topology, Arc::new(workspaces))?;
    ProcessSupervisor::new(leader).run()
}

/// Print host features and the run's pre-flight results. Returns whether a
/// run would pass pre-flight.
pub fn check(config: &TileRunConfig) -> bool {
    info!("Checking tilerun requirements");
    println!("System:\n");
    let caps = SystemCapabilities::detect();
    println!("{}", caps.summary());
    if config.development.sandbox && !caps.can_sandbox() {
        println!(
            "\n{}",
            style("this host cannot sandbox tiles; set development.sandbox = false to run unsandboxed")
                .yellow()
        );
    }

    let settings = SupervisorSettings::from_config(config, None);
    let preflight = preflight::check(&settings);
    println!("\nRequirements for '{}':\n", config.name);
    println!("{}", preflight.report());

    if preflight.is_ok() {
        println!("\n{}", style("ready to run").green().bold());
    } else {
        println!("\n{}", style("not ready to run").red().bold());
    }
    preflight.is_ok()
}

pub fn topology_entries(config: &TileRunConfig) -> Result<Vec<TopologyEntry>> {
    let topology = build_topology(config)?;
    let affinity = AffinityTable::parse(&config.layout.affinity)?;
    affinity.ensure_covers(topology.required_tiles())?;

    Ok(topology
        .slots()
        .iter()
        .enumerate()
        .map(|(ordinal, slot)| TopologyEntry {
            ordinal,
            tile: slot.descriptor.name,
            replica: slot.replica,
            cpu: affinity.slot(ordinal).to_string(),
            workspace: workspace::private_name(&config.name, slot.descriptor.name, slot.replica),
        })
        .collect())
}

pub fn print_topology(config: &TileRunConfig, json: bool) -> Result<()> {
    let entries = topology_entries(config)?;

    if json {
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| tilerun_core::TileError::Configuration(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    println!("{:>7}  {:<8} {:>7}  {:<8}  workspace", "ordinal", "tile", "replica", "cpu");
    for entry in entries {
        println!(
            "{:>7}  {:<8} {:>7}  {:<8}  {}",
            entry.ordinal, entry.tile, entry.replica, entry.cpu, entry.workspace
        );
    }
    Ok(())
}
