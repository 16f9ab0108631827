mod util;

use mesh_ghosting::algs::lattice::{AdjacencyKind, adjacent};
use mesh_ghosting::coordinator::RelationshipManagerParams;
use mesh_ghosting::ghosting::{GhostingClass, TargetSystem};
use mesh_ghosting::mesh_generation::{MeshGenerationOptions, Periodicity, interval_mesh};
use mesh_ghosting::coordinator::AttachmentCoordinator;
use mesh_ghosting::mesh_error::GhostingError;
use util::*;

fn periodic_images(class: GhostingClass) -> RelationshipManagerParams {
    RelationshipManagerParams::new("PeriodicImageGhosting", class)
        .boundaries_pair("boundary_x_min", "boundary_x_max")
}

#[test]
fn ends_of_a_periodic_interval_are_adjacent() {
    let c = periodic_interval_coordinator(0, no_defaults());
    let mesh = c.mesh(TargetSystem::Undisplaced).unwrap();
    assert!(adjacent(mesh, eid(0), AdjacencyKind::Side).contains(&eid(9)));
    assert!(adjacent(mesh, eid(9), AdjacencyKind::Side).contains(&eid(0)));
    assert!(adjacent(mesh, eid(0), AdjacencyKind::Point).contains(&eid(9)));
}

#[test]
fn periodic_images_are_one_hop_layers() {
    let mut c = periodic_interval_coordinator(0, no_defaults());
    c.register(&side_layers(GhostingClass::GEOMETRIC, 1)).unwrap();
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 0), ids(&[5, 9]));
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 1), ids(&[0, 4]));
}

#[test]
fn conservative_until_paired_then_precise() {
    let opts = MeshGenerationOptions::on_rank(0, 2).with_periodic(Periodicity { x: true, y: false });
    let mesh = interval_mesh(10, 0.0, 1.0, opts).unwrap();
    let mut c = AttachmentCoordinator::new(mesh, no_defaults()).unwrap();
    c.prepare_mesh().unwrap();
    c.register(&periodic_images(GhostingClass::GEOMETRIC)).unwrap();

    // No pairing yet: both boundary sides, minus what rank 1 owns.
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 1), ids(&[0]));
    // Rank 0 only needs element 9 either way.
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 0), ids(&[9]));

    c.mesh_mut(TargetSystem::Undisplaced)
        .unwrap()
        .add_periodic_boundary("boundary_x_min", "boundary_x_max")
        .unwrap();
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 0), ids(&[9]));
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 1), ids(&[0]));
}

#[test]
fn coupling_instances_skip_the_conservative_phase() {
    let opts = MeshGenerationOptions::on_rank(0, 2).with_periodic(Periodicity { x: true, y: false });
    let mesh = interval_mesh(10, 0.0, 1.0, opts).unwrap();
    let mut c = AttachmentCoordinator::new(mesh, no_defaults()).unwrap();
    c.prepare_mesh().unwrap();
    c.add_system("u", 1).unwrap();
    c.register(&periodic_images(GhostingClass::COUPLING)).unwrap();
    assert!(ghosts(&c, GhostingClass::COUPLING, 0).is_empty());
}

#[test]
fn algebraic_coupling_instances_skip_the_conservative_phase() {
    let opts = MeshGenerationOptions::on_rank(0, 2).with_periodic(Periodicity { x: true, y: false });
    let mesh = interval_mesh(10, 0.0, 1.0, opts).unwrap();
    let mut c = AttachmentCoordinator::new(mesh, no_defaults()).unwrap();
    c.prepare_mesh().unwrap();
    c.add_system("u", 1).unwrap();
    c.register(&periodic_images(GhostingClass::ALGEBRAIC | GhostingClass::COUPLING))
        .unwrap();
    assert!(ghosts(&c, GhostingClass::COUPLING, 0).is_empty());
    assert_eq!(ghosts(&c, GhostingClass::ALGEBRAIC, 0), ids(&[9]));
}

#[test]
fn point_neighbours_of_images_on_request() {
    let mut c = periodic_interval_coordinator(0, no_defaults());
    let mut p = periodic_images(GhostingClass::GEOMETRIC);
    p.ghost_point_neighbors = true;
    c.register(&p).unwrap();
    // Image of 0 is 9; its point neighbours are 8 and 0.
    assert_eq!(ghosts(&c, GhostingClass::GEOMETRIC, 0), ids(&[8, 9]));
}

#[test]
fn unknown_boundary_is_rejected_at_registration() {
    let mut c = periodic_interval_coordinator(0, no_defaults());
    let err = c
        .register(
            &RelationshipManagerParams::new("PeriodicImageGhosting", GhostingClass::GEOMETRIC)
                .boundaries_pair("no_such_a", "no_such_b"),
        )
        .unwrap_err();
    assert!(matches!(err, GhostingError::UnknownBoundary(ref b) if b == "no_such_a"));
    assert_eq!(c.managers().count(), 0);

    // Nothing bad was left behind.
    assert!(
        c.ghost_set(TargetSystem::Undisplaced, GhostingClass::GEOMETRIC, 0)
            .unwrap()
            .is_empty()
    );
    c.delete_remote_elements().unwrap();
}

#[test]
fn half_a_pair_is_a_configuration_error() {
    let mut c = periodic_interval_coordinator(0, no_defaults());
    let mut p = RelationshipManagerParams::new("PeriodicImageGhosting", GhostingClass::GEOMETRIC);
    p.primary_boundary = Some("boundary_x_min".into());
    assert!(c.register(&p).is_err());
}
