//! tilerun-namespace: groups of child processes that live and die together
//!
//! A [`ProcessNamespace`] spawns children with their own stacks and waits on
//! them. Isolation is either a new PID namespace (the kernel kills every
//! member once the namespace init exits) or a plain process group (the owner
//! must kill members itself).

pub mod netns;
pub mod process;
pub mod termination;

pub use process::{Child, Isolation, ProcessNamespace, STACK_SIZE};
pub use termination::Termination;
