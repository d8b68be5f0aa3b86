//! TOML configuration
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! name = "tilerun"
//!
//! [layout]
//! affinity = "0-4"
//! ingest_tile_count = 1
//! verify_tile_count = 1
//!
//! [development]
//! sandbox = true
//!
//! [development.netns]
//! enabled = false
//! interface = "veth_test_xdp_0"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tilerun_core::{Result, TileError, util};
use tilerun_resources::AffinityTable;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TileRunConfig {
    /// Application name, prefix of every workspace name
    pub name: String,
    /// User the tiles run as
    pub uid: u32,
    pub gid: u32,
    pub layout: LayoutConfig,
    pub development: DevelopmentConfig,
    pub workspace: WorkspaceConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub affinity: String,
    pub ingest_tile_count: usize,
    pub verify_tile_count: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevelopmentConfig {
    /// Run tiles in a PID namespace with seccomp; disable only to debug
    pub sandbox: bool,
    pub netns: NetnsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetnsConfig {
    pub enabled: bool,
    /// Name under /var/run/netns
    pub interface: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    pub directory: PathBuf,
    /// Create absent workspace files before booting
    pub create_missing: bool,
    /// Size in bytes of workspaces created by `create_missing`
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Log file; stderr when unset
    pub path: Option<PathBuf>,
    pub level: String,
}

impl Default for TileRunConfig {
    fn default() -> Self {
        Self {
            name: "tilerun".to_string(),
            uid: util::get_uid(),
            gid: util::get_gid(),
            layout: LayoutConfig::default(),
            development: DevelopmentConfig::default(),
            workspace: WorkspaceConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            affinity: "0-4".to_string(),
            ingest_tile_count: 1,
            verify_tile_count: 1,
        }
    }
}

impl Default for DevelopmentConfig {
    fn default() -> Self {
        Self {
            sandbox: true,
            netns: NetnsConfig::default(),
        }
    }
}

impl Default for NetnsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interface: "veth_test_xdp_0".to_string(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/dev/shm"),
            create_missing: false,
            size: 1 << 20,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: None,
            level: "info".to_string(),
        }
    }
}

impl TileRunConfig {
    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TileError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| TileError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.contains('/') {
            return Err(TileError::Configuration(format!(
                "name '{}' must be non-empty and contain no '/'",
                self.name
            )));
        }
        if self.layout.ingest_tile_count == 0 || self.layout.verify_tile_count == 0 {
            return Err(TileError::Configuration(
                "layout.ingest_tile_count and layout.verify_tile_count must be at least 1"
                    .to_string(),
            ));
        }
        AffinityTable::parse(&self.layout.affinity)?;
        if self.development.netns.enabled && self.development.netns.interface.is_empty() {
            return Err(TileError::Configuration(
                "development.netns.interface is required when netns is enabled".to_string(),
            ));
        }
        if self.workspace.create_missing && self.workspace.size == 0 {
            return Err(TileError::Configuration(
                "workspace.size must be non-zero when create_missing is set".to_string(),
            ));
        }
        log::LevelFilter::from_str(&self.log.level).map_err(|_| {
            TileError::Configuration(format!("unknown log level '{}'", self.log.level))
        })?;
        Ok(())
    }

    /// Network namespace to enter before spawning, if enabled
    pub fn network_namespace(&self) -> Option<&str> {
        self.development
            .netns
            .enabled
            .then_some(self.development.netns.interface.as_str())
    }
}
