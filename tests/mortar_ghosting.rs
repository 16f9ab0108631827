mod util;

use mesh_ghosting::algs::communicator::{NoComm, RayonComm};
use mesh_ghosting::coordinator::{AttachmentCoordinator, RelationshipManagerParams};
use mesh_ghosting::ghosting::strategies::MortarNames;
use mesh_ghosting::ghosting::{GhostingClass, TargetSystem};
use mesh_ghosting::mesh_error::GhostingError;
use mesh_ghosting::mesh_generation::{
    LEFT_INTERFACE, MeshGenerationOptions, RIGHT_INTERFACE, add_lower_d_block, two_block_mesh,
};
use mesh_ghosting::topology::point::SubdomainId;
use serial_test::serial;
use util::*;

// Left block 2x2 (elements 0..=3), right block 3x3 (4..=12), then the
// lower-d faces: 13, 14 on the left interface (parents 1, 3) and 15, 16, 17
// on the right one (parents 4, 7, 10). 0..=6 and 13..=15 live on rank 0.

fn names() -> MortarNames {
    MortarNames {
        primary_boundary: RIGHT_INTERFACE.into(),
        secondary_boundary: LEFT_INTERFACE.into(),
        primary_subdomain: "primary_lower".into(),
        secondary_subdomain: "secondary_lower".into(),
    }
}

fn params(class: GhostingClass) -> RelationshipManagerParams {
    RelationshipManagerParams::new("AugmentSparsityOnInterface", class)
        .boundaries_pair(RIGHT_INTERFACE, LEFT_INTERFACE)
        .subdomains_pair("primary_lower", "secondary_lower")
}

fn mortar_coordinator(rank: usize) -> AttachmentCoordinator {
    let mut mesh = two_block_mesh((2, 2), (3, 3), MeshGenerationOptions::on_rank(rank, 2)).unwrap();
    add_lower_d_block(&mut mesh, LEFT_INTERFACE, SubdomainId::new(10), "secondary_lower").unwrap();
    add_lower_d_block(&mut mesh, RIGHT_INTERFACE, SubdomainId::new(11), "primary_lower").unwrap();
    let mut c = AttachmentCoordinator::new(mesh, no_defaults()).unwrap();
    c.prepare_mesh().unwrap();
    c.register(&params(GhostingClass::GEOMETRIC)).unwrap();
    c
}

#[test]
fn whole_interface_is_ghosted_before_the_table_exists() {
    let c = mortar_coordinator(1);
    assert_eq!(
        ghosts(&c, GhostingClass::GEOMETRIC, 1),
        ids(&[1, 3, 4, 13, 14, 15])
    );
}

#[test]
#[serial]
fn gathered_table_narrows_ghosting_to_overlapping_faces() {
    let world = RayonComm::world(2);
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = world
            .iter()
            .enumerate()
            .map(|(rank, comm)| {
                s.spawn(move || {
                    let mut c = mortar_coordinator(rank);
                    let n = c
                        .build_mortar_interface(TargetSystem::Undisplaced, &names(), comm)
                        .unwrap();
                    (n, ghosts(&c, GhostingClass::GEOMETRIC, 1))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for (rank, (n_pairs, ghosted)) in results.into_iter().enumerate() {
        // 13 overlaps 15 and 16; 14 overlaps 16 and 17.
        assert_eq!(n_pairs, 4, "rank {rank}");
        assert_eq!(ghosted, ids(&[1, 3, 13, 14]), "rank {rank}");
    }
}

#[test]
fn serial_table_on_a_single_rank() {
    let mut mesh = two_block_mesh((2, 2), (3, 3), MeshGenerationOptions::default()).unwrap();
    add_lower_d_block(&mut mesh, LEFT_INTERFACE, SubdomainId::new(10), "secondary_lower").unwrap();
    add_lower_d_block(&mut mesh, RIGHT_INTERFACE, SubdomainId::new(11), "primary_lower").unwrap();
    let mut c = AttachmentCoordinator::new(mesh, no_defaults()).unwrap();
    c.prepare_mesh().unwrap();
    let n = c
        .build_mortar_interface(TargetSystem::Undisplaced, &names(), &NoComm)
        .unwrap();
    assert_eq!(n, 4);
    let table = c
        .mesh(TargetSystem::Undisplaced)
        .unwrap()
        .mortar_interface(&names().resolve(c.mesh(TargetSystem::Undisplaced).unwrap()).unwrap())
        .unwrap();
    let primaries: Vec<_> = table.primaries_of(eid(14)).collect();
    assert_eq!(primaries, vec![eid(16), eid(17)]);
}

#[test]
fn coupling_instances_wait_for_the_table() {
    let mut c = mortar_coordinator(1);
    c.add_system("lm", 1).unwrap();
    c.register(&params(GhostingClass::COUPLING)).unwrap();
    assert!(ghosts(&c, GhostingClass::COUPLING, 1).is_empty());
}

#[test]
fn algebraic_coupling_instances_wait_for_the_table() {
    let mut c = mortar_coordinator(1);
    c.add_system("lm", 1).unwrap();
    c.register(&params(GhostingClass::ALGEBRAIC | GhostingClass::COUPLING))
        .unwrap();
    assert!(ghosts(&c, GhostingClass::COUPLING, 1).is_empty());
    // Algebraic ghosting keeps the conservative whole interface.
    assert_eq!(
        ghosts(&c, GhostingClass::ALGEBRAIC, 1),
        ids(&[1, 3, 4, 13, 14, 15])
    );
    c.init_dof_maps().unwrap();
    let sparsity = c
        .system(TargetSystem::Undisplaced, "lm")
        .unwrap()
        .dof_map()
        .sparsity()
        .clone();
    for (row, cols) in sparsity.rows() {
        assert_eq!(cols.iter().copied().collect::<Vec<_>>(), vec![row]);
    }
}

#[test]
fn unknown_subdomain_is_rejected_at_registration() {
    let mut c = mortar_coordinator(0);
    let p = RelationshipManagerParams::new("AugmentSparsityOnInterface", GhostingClass::ALGEBRAIC)
        .boundaries_pair(RIGHT_INTERFACE, LEFT_INTERFACE)
        .subdomains_pair("primary_lower", "no_such_lower");
    assert!(matches!(
        c.register(&p),
        Err(GhostingError::UnknownSubdomain(_))
    ));
    assert_eq!(c.managers().count(), 1);
}

#[test]
fn missing_subdomain_name_is_rejected() {
    let mut c = mortar_coordinator(0);
    let p = RelationshipManagerParams::new("AugmentSparsityOnInterface", GhostingClass::GEOMETRIC)
        .boundaries_pair(RIGHT_INTERFACE, LEFT_INTERFACE);
    assert!(c.register(&p).is_err());
}
