#![allow(dead_code)]
use mesh_ghosting::{
    coordinator::{Admission, AttachmentCoordinator, GhostingConfig, RelationshipManagerParams},
    ghosting::{GhostingClass, RelationshipManager, TargetSystem},
    mesh_generation::{MeshGenerationOptions, Periodicity, interval_mesh},
    topology::point::ElemId,
};
use std::collections::BTreeSet;
use std::sync::Arc;

pub fn eid(u: u64) -> ElemId {
    ElemId::new(u)
}

pub fn ids(raw: &[u64]) -> BTreeSet<ElemId> {
    raw.iter().copied().map(ElemId::new).collect()
}

pub fn no_defaults() -> GhostingConfig {
    GhostingConfig {
        default_ghosting: false,
        ..GhostingConfig::default()
    }
}

/// The 1-D scenario: 10 segments block-partitioned over 2 ranks (0..=4 on
/// rank 0, 5..=9 on rank 1), viewed from `rank`, prepared.
pub fn interval_coordinator(rank: usize, config: GhostingConfig) -> AttachmentCoordinator {
    let mesh = interval_mesh(10, 0.0, 1.0, MeshGenerationOptions::on_rank(rank, 2)).unwrap();
    let mut c = AttachmentCoordinator::new(mesh, config).unwrap();
    c.prepare_mesh().unwrap();
    c
}

/// Like [`interval_coordinator`] with the two ends identified and the
/// periodic pair declared.
pub fn periodic_interval_coordinator(rank: usize, config: GhostingConfig) -> AttachmentCoordinator {
    let opts = MeshGenerationOptions::on_rank(rank, 2).with_periodic(Periodicity { x: true, y: false });
    let mesh = interval_mesh(10, 0.0, 1.0, opts).unwrap();
    let mut c = AttachmentCoordinator::new(mesh, config).unwrap();
    c.prepare_mesh().unwrap();
    c.mesh_mut(TargetSystem::Undisplaced)
        .unwrap()
        .add_periodic_boundary("boundary_x_min", "boundary_x_max")
        .unwrap();
    c
}

pub fn side_layers(class: GhostingClass, depth: u32) -> RelationshipManagerParams {
    RelationshipManagerParams::new("ElementSideNeighborLayers", class).layers(depth)
}

pub fn point_layers(class: GhostingClass, depth: u32) -> RelationshipManagerParams {
    RelationshipManagerParams::new("ElementPointNeighborLayers", class).layers(depth)
}

pub fn accepted(a: Admission) -> Arc<RelationshipManager> {
    match a {
        Admission::Accepted(rm) => rm,
        Admission::Subsumed { by, candidate } => {
            panic!("`{candidate}` was subsumed by `{}`", by.name())
        }
    }
}

pub fn ghosts(c: &AttachmentCoordinator, class: GhostingClass, rank: usize) -> BTreeSet<ElemId> {
    c.ghost_set(TargetSystem::Undisplaced, class, rank)
        .unwrap()
        .to_set()
}
