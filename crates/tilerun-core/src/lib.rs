//! tilerun-core: shared types, errors, and process identity for tilerun
//!
//! This crate provides the foundational pieces used by every tilerun crate:
//! - Error type and Result alias
//! - Process-local identity (spawn ordinal + name) used by diagnostics
//! - Async-signal-safe helpers (real pid lookup, stderr writes, exit_group)
//! - Runtime capability detection for pre-flight checks

pub mod capabilities;
pub mod error;
pub mod identity;
pub mod util;

pub use capabilities::{Capability, SystemCapabilities};
pub use error::{Result, TileError};
