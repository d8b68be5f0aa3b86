//! Static tile topology

use crate::tile::TileDescriptor;
use crate::workspace::{private_name, shared_name};
use std::collections::BTreeSet;
use tilerun_core::{Result, TileError};

/// One process to spawn
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub descriptor: &'static TileDescriptor,
    pub replica: usize,
}

/// Descriptors backing each pipeline stage
#[derive(Debug, Clone, Copy)]
pub struct PipelineRoles {
    pub ingest: &'static TileDescriptor,
    pub verify: &'static TileDescriptor,
    pub dedup: &'static TileDescriptor,
    pub pack: &'static TileDescriptor,
    pub forward: &'static TileDescriptor,
}

/// Ordered list of tiles; position in the list is the spawn ordinal
#[derive(Debug, Clone)]
pub struct Topology {
    slots: Vec<Slot>,
}

impl Topology {
    /// All ingest replicas, all verify replicas, then one each of dedup,
    /// pack and forward.
    pub fn pipeline(
        roles: &PipelineRoles,
        ingest_count: usize,
        verify_count: usize,
    ) -> Result<Self> {
        if ingest_count == 0 || verify_count == 0 {
            return Err(TileError::Configuration(format!(
                "ingest and verify tile counts must be at least 1 (got {} and {})",
                ingest_count, verify_count
            )));
        }

        let replicas = |descriptor: &'static TileDescriptor, count: usize| {
            (0..count).map(move |replica| Slot {
                descriptor,
                replica,
            })
        };

        let slots = replicas(roles.ingest, ingest_count)
            .chain(replicas(roles.verify, verify_count))
            .chain(replicas(roles.dedup, 1))
            .chain(replicas(roles.pack, 1))
            .chain(replicas(roles.forward, 1))
            .collect();
        Ok(Self { slots })
    }

    pub fn from_slots(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of tiles, and therefore of affinity entries, required
    pub fn required_tiles(&self) -> usize {
        self.slots.len()
    }

    /// Every workspace file the topology attaches to, sorted
    pub fn workspace_names(&self, app: &str) -> Vec<String> {
        let mut names = BTreeSet::new();
        for slot in &self.slots {
            names.insert(private_name(app, slot.descriptor.name, slot.replica));
            for wksp in slot.descriptor.shared_workspaces() {
                names.insert(shared_name(app, wksp));
            }
        }
        names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles;

    #[test]
    fn pipeline_order_and_replicas() {
        let topology = Topology::pipeline(&tiles::BUILTIN, 2, 2).unwrap();
        let layout: Vec<_> = topology
            .slots()
            .iter()
            .map(|s| (s.descriptor.name, s.replica))
            .collect();
        assert_eq!(
            layout,
            [
                ("quic", 0),
                ("quic", 1),
                ("verify", 0),
                ("verify", 1),
                ("dedup", 0),
                ("pack", 0),
                ("forward", 0),
            ]
        );
    }

    #[test]
    fn required_tiles_is_two_v_plus_three() {
        for v in 1..6 {
            let topology = Topology::pipeline(&tiles::BUILTIN, v, v).unwrap();
            assert_eq!(topology.required_tiles(), 2 * v + 3);
        }
    }

    #[test]
    fn zero_replicas_is_a_configuration_error() {
        let err = Topology::pipeline(&tiles::BUILTIN, 0, 1).unwrap_err();
        assert!(matches!(err, TileError::Configuration(_)));
    }

    #[test]
    fn replicas_share_one_descriptor() {
        let topology = Topology::pipeline(&tiles::BUILTIN, 1, 3).unwrap();
        let verify: Vec<_> = topology
            .slots()
            .iter()
            .filter(|s| s.descriptor.name == "verify")
            .collect();
        assert_eq!(verify.len(), 3);
        assert!(
            verify
                .windows(2)
                .all(|w| std::ptr::eq(w[0].descriptor, w[1].descriptor))
        );
    }

    #[test]
    fn workspace_names_cover_private_and_shared() {
        let topology = Topology::pipeline(&tiles::BUILTIN, 1, 2).unwrap();
        let names = topology.workspace_names("fd");
        assert!(names.contains(&"fd_verify1.wksp".to_string()));
        assert!(names.contains(&"fd_quic_verify0.wksp".to_string()));
        assert!(names.contains(&"fd_pack_forward0.wksp".to_string()));
        // 4 shared links, 6 private workspaces
        assert_eq!(names.len(), 10);
    }
}
