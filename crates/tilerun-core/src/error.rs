//! Error types for tile supervision

use std::io;
use thiserror::Error;

/// Result type for tilerun operations
pub type Result<T> = std::result::Result<T, TileError>;

/// Errors that can occur while configuring, spawning or running tiles
#[derive(Error, Debug)]
pub enum TileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Syscall error: {0}")]
    Syscall(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Namespace error: {0}")]
    Namespace(String),

    #[error("Seccomp error: {0}")]
    Seccomp(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Process exited with code {code}")]
    ProcessExit { code: i32 },
}

impl TileError {
    /// Process exit code a tile or supervisor reports when it stops with this error.
    ///
    /// Explicit exits keep their code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            TileError::ProcessExit { code } => *code,
            _ => 1,
        }
    }
}
