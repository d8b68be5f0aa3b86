//! tilerun-resources: CPU placement and process resource limits
//!
//! Provides:
//! - Affinity tables mapping spawn ordinals to CPUs (or floating slots)
//! - Thin getrlimit/setrlimit wrappers
//! - The pre-flight checker that verifies capabilities and limits before
//!   anything privileged happens

pub mod affinity;
pub mod preflight;
pub mod rlimit;

pub use affinity::{AffinityTable, CpuSlot};
pub use preflight::Preflight;
pub use rlimit::Resource;
