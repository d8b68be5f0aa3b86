//! Creating tile processes and booting them

pub mod entry;
pub mod spawner;

pub use spawner::TileSpawner;
